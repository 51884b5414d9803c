//! Durable storage for the single unsaved wizard draft.
//!
//! There is exactly one draft slot per storage origin. Every autosave
//! overwrites it; a second wizard started in the same origin replaces the
//! first one's draft. Reads never fail: missing, corrupt or stale drafts all
//! come back as `None`.

pub mod debounce;

pub use debounce::DraftDebouncer;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::types::SessionId;
use crate::wizard::WizardState;

/// File name of the draft slot within the state directory
pub const DRAFT_FILE: &str = "draft.json";

/// Source of the current time for staleness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// A persisted snapshot of wizard progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub session_id: SessionId,
    pub saved_at: DateTime<Utc>,
    pub snapshot: WizardState,
}

impl DraftRecord {
    /// Recoverable only while younger than `freshness`
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now.signed_duration_since(self.saved_at) < freshness
    }
}

/// How long drafts stay recoverable and where "now" comes from
#[derive(Clone)]
pub struct DraftPolicy {
    pub freshness: Duration,
    pub clock: Arc<dyn Clock>,
}

impl DraftPolicy {
    pub fn new(freshness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { freshness, clock }
    }

    fn stamp(&self, session_id: SessionId, state: &WizardState) -> DraftRecord {
        DraftRecord {
            session_id,
            saved_at: self.clock.now(),
            snapshot: state.clone(),
        }
    }

    /// Parse raw slot contents, dropping anything corrupt or stale
    fn recoverable(&self, raw: &str) -> Option<DraftRecord> {
        let record: DraftRecord = match serde_json::from_str(raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable draft");
                return None;
            }
        };

        if record.is_fresh(self.clock.now(), self.freshness) {
            Some(record)
        } else {
            tracing::debug!(saved_at = %record.saved_at, "ignoring stale draft");
            None
        }
    }
}

impl Default for DraftPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(24), Arc::new(SystemClock))
    }
}

/// Persistence of the single wizard draft
pub trait DraftStore: Send + Sync {
    /// Overwrite the draft slot. Failures are logged, never returned.
    fn save(&self, session_id: SessionId, state: &WizardState);

    /// The stored draft if present, parseable and fresh
    fn load_if_recoverable(&self) -> Option<DraftRecord>;

    /// Remove the draft. Idempotent.
    fn clear(&self);
}

/// Draft slot stored as a JSON file
pub struct FileDraftStore {
    path: PathBuf,
    policy: DraftPolicy,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>, policy: DraftPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    /// Store using the standard file name inside `state_dir`
    pub fn in_dir(state_dir: &Path, policy: DraftPolicy) -> Self {
        Self::new(state_dir.join(DRAFT_FILE), policy)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, record: &DraftRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(record)?;

        // Write aside and rename so a crash never leaves a torn draft
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, session_id: SessionId, state: &WizardState) {
        let record = self.policy.stamp(session_id, state);
        match self.write(&record) {
            Ok(()) => tracing::debug!(%session_id, step = %state.current_step, "draft saved"),
            Err(err) => {
                tracing::warn!(%session_id, path = %self.path.display(), error = %err, "failed to save draft");
            }
        }
    }

    fn load_if_recoverable(&self) -> Option<DraftRecord> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => self.policy.recoverable(&raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read draft");
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("draft cleared"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to clear draft");
            }
        }
    }
}

/// In-process draft slot that counts writes
#[derive(Default)]
pub struct MemoryDraftStore {
    slot: Mutex<Option<String>>,
    saves: Mutex<usize>,
    policy: DraftPolicy,
}

impl MemoryDraftStore {
    pub fn new(policy: DraftPolicy) -> Self {
        Self {
            slot: Mutex::new(None),
            saves: Mutex::new(0),
            policy,
        }
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// Raw slot contents, as they would sit on disk
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Replace the slot contents directly, bypassing serialization
    pub fn put_raw(&self, raw: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(raw.into());
        }
    }

    /// Store a fully formed record, e.g. one with a chosen timestamp
    pub fn put_record(&self, record: &DraftRecord) {
        if let Ok(raw) = serde_json::to_string(record) {
            self.put_raw(raw);
        }
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, session_id: SessionId, state: &WizardState) {
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        let record = self.policy.stamp(session_id, state);
        match serde_json::to_string(&record) {
            Ok(raw) => self.put_raw(raw),
            Err(err) => tracing::warn!(error = %err, "failed to serialize draft"),
        }
    }

    fn load_if_recoverable(&self) -> Option<DraftRecord> {
        let raw = self.raw()?;
        self.policy.recoverable(&raw)
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use crate::wizard::{FormData, WizardStep};
    use serde_json::json;
    use tempfile::TempDir;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn manual_policy() -> (Arc<ManualClock>, DraftPolicy) {
        let clock = Arc::new(ManualClock::new(start()));
        let policy = DraftPolicy::new(Duration::hours(24), clock.clone());
        (clock, policy)
    }

    fn sample_state() -> WizardState {
        let mut form_data = FormData::new();
        form_data.insert("bride".to_string(), json!("A"));
        form_data.insert("groom".to_string(), json!("B"));
        WizardState {
            current_step: WizardStep::TemplateChoice,
            selected_category: Some(Category::Wedding),
            form_data: Some(form_data),
            ..WizardState::default()
        }
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = TempDir::new().unwrap();
        let (_, policy) = manual_policy();
        let store = FileDraftStore::in_dir(dir.path(), policy);
        let session = SessionId::generate();

        store.save(session, &sample_state());
        let record = store.load_if_recoverable().unwrap();

        assert_eq!(record.session_id, session);
        assert_eq!(record.saved_at, start());
        assert_eq!(record.snapshot, sample_state());
        assert!(!dir.path().join("draft.json.tmp").exists());
    }

    #[test]
    fn test_file_store_overwrites_single_slot() {
        let dir = TempDir::new().unwrap();
        let (_, policy) = manual_policy();
        let store = FileDraftStore::in_dir(dir.path(), policy);

        store.save(SessionId::generate(), &WizardState::default());
        let second = SessionId::generate();
        store.save(second, &sample_state());

        assert_eq!(store.load_if_recoverable().unwrap().session_id, second);
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileDraftStore::in_dir(dir.path(), DraftPolicy::default());
        assert!(store.load_if_recoverable().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileDraftStore::in_dir(dir.path(), DraftPolicy::default());
        fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load_if_recoverable().is_none());
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (_, policy) = manual_policy();
        let store = FileDraftStore::in_dir(dir.path(), policy);
        store.save(SessionId::generate(), &sample_state());

        store.clear();
        store.clear();

        assert!(store.load_if_recoverable().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_stale_draft_ignored_but_kept() {
        let dir = TempDir::new().unwrap();
        let (clock, policy) = manual_policy();
        let store = FileDraftStore::in_dir(dir.path(), policy);
        store.save(SessionId::generate(), &sample_state());

        clock.advance(Duration::hours(23));
        assert!(store.load_if_recoverable().is_some());

        clock.advance(Duration::hours(1));
        assert!(store.load_if_recoverable().is_none());
        assert!(store.path().exists());
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let (_, policy) = manual_policy();
        let store = MemoryDraftStore::new(policy);
        assert_eq!(store.save_count(), 0);

        store.save(SessionId::generate(), &sample_state());
        store.save(SessionId::generate(), &sample_state());

        assert_eq!(store.save_count(), 2);
        assert!(store.load_if_recoverable().is_some());
    }

    #[test]
    fn test_memory_store_corrupt_slot_is_none() {
        let store = MemoryDraftStore::new(DraftPolicy::default());
        store.put_raw(r#"{"session_id":"nope"}"#);
        assert!(store.load_if_recoverable().is_none());
    }

    #[test]
    fn test_record_wire_shape() {
        let record = DraftRecord {
            session_id: SessionId::generate(),
            saved_at: start(),
            snapshot: sample_state(),
        };
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["saved_at"], json!("2026-03-01T12:00:00Z"));
        assert_eq!(value["snapshot"]["current_step"], json!(3));
        assert_eq!(value["snapshot"]["selected_category"], json!("wedding"));
        assert_eq!(value["snapshot"]["selected_template"], json!(null));
        assert_eq!(value["snapshot"]["form_data"]["groom"], json!("B"));
    }
}
