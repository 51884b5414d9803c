//! Editing session tracking.
//!
//! A session lives as long as one wizard controller. The first successful
//! create records the backend id so that every later save in the same session
//! updates that entity instead of creating a duplicate.

use crate::types::{InvitationId, SessionId};

/// What a submission should do against the entity store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    /// Nothing saved yet in this session
    Create,
    /// Update the entity created earlier in this session
    SessionUpdate(InvitationId),
    /// Update the existing entity the wizard was opened to edit
    EditUpdate(InvitationId),
}

impl SaveAction {
    pub fn is_create(&self) -> bool {
        matches!(self, SaveAction::Create)
    }

    /// Target entity for update actions
    pub fn target(&self) -> Option<&InvitationId> {
        match self {
            SaveAction::Create => None,
            SaveAction::SessionUpdate(id) | SaveAction::EditUpdate(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionTracker {
    session_id: SessionId,
    created_invitation_id: Option<InvitationId>,
    /// Set when the wizard was opened against an existing entity
    editing: Option<InvitationId>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            session_id: SessionId::generate(),
            created_invitation_id: None,
            editing: None,
        }
    }

    /// Tracker for editing an entity that already exists in the backend
    pub fn for_existing(id: InvitationId) -> Self {
        Self {
            editing: Some(id),
            ..Self::new()
        }
    }

    /// Start a fresh session, forgetting any entity created in the old one
    pub fn new_session(&mut self) -> SessionId {
        self.session_id = SessionId::generate();
        self.created_invitation_id = None;
        tracing::debug!(session_id = %self.session_id, "started wizard session");
        self.session_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn mark_created(&mut self, id: InvitationId) {
        tracing::debug!(session_id = %self.session_id, entity_id = %id, "session now tracks created invitation");
        self.created_invitation_id = Some(id);
    }

    pub fn created_invitation_id(&self) -> Option<&InvitationId> {
        self.created_invitation_id.as_ref()
    }

    pub fn editing(&self) -> Option<&InvitationId> {
        self.editing.as_ref()
    }

    pub fn save_action(&self) -> SaveAction {
        if let Some(id) = &self.editing {
            SaveAction::EditUpdate(id.clone())
        } else if let Some(id) = &self.created_invitation_id {
            SaveAction::SessionUpdate(id.clone())
        } else {
            SaveAction::Create
        }
    }

    /// Forget the created entity, e.g. when the user abandons the wizard
    pub fn clear_session(&mut self) {
        self.created_invitation_id = None;
    }

    /// Drop every entity binding, including the one being edited.
    ///
    /// Afterwards the next save creates a new invitation.
    pub fn reset(&mut self) {
        if let Some(id) = self.editing.take() {
            tracing::debug!(session_id = %self.session_id, entity_id = %id, "no longer editing invitation");
        }
        self.created_invitation_id = None;
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_creates() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.save_action(), SaveAction::Create);
        assert!(tracker.created_invitation_id().is_none());
    }

    #[test]
    fn test_mark_created_turns_saves_into_updates() {
        let mut tracker = SessionTracker::new();
        tracker.mark_created(InvitationId::new("inv-1"));

        assert_eq!(
            tracker.save_action(),
            SaveAction::SessionUpdate(InvitationId::new("inv-1"))
        );
        // Stays an update however many times it is asked
        assert!(!tracker.save_action().is_create());
    }

    #[test]
    fn test_clear_session_returns_to_create() {
        let mut tracker = SessionTracker::new();
        let session = tracker.session_id();
        tracker.mark_created(InvitationId::new("inv-1"));
        tracker.clear_session();

        assert_eq!(tracker.save_action(), SaveAction::Create);
        assert_eq!(tracker.session_id(), session);
    }

    #[test]
    fn test_new_session_changes_id_and_forgets_entity() {
        let mut tracker = SessionTracker::new();
        let first = tracker.session_id();
        tracker.mark_created(InvitationId::new("inv-1"));

        let second = tracker.new_session();

        assert_ne!(first, second);
        assert_eq!(tracker.save_action(), SaveAction::Create);
    }

    #[test]
    fn test_edit_mode_always_updates_the_edited_entity() {
        let mut tracker = SessionTracker::for_existing(InvitationId::new("inv-9"));
        assert_eq!(
            tracker.save_action(),
            SaveAction::EditUpdate(InvitationId::new("inv-9"))
        );

        tracker.mark_created(InvitationId::new("inv-10"));
        assert_eq!(
            tracker.save_action().target(),
            Some(&InvitationId::new("inv-9"))
        );
    }

    #[test]
    fn test_reset_leaves_edit_mode() {
        let mut tracker = SessionTracker::for_existing(InvitationId::new("inv-9"));
        tracker.mark_created(InvitationId::new("inv-10"));

        tracker.reset();

        assert!(tracker.editing().is_none());
        assert!(tracker.created_invitation_id().is_none());
        assert_eq!(tracker.save_action(), SaveAction::Create);
    }
}
