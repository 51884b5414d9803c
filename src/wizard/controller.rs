//! Wizard controller: step transitions, draft recovery, autosave and submission.
//!
//! The controller owns the [`WizardState`] and is the only thing that mutates
//! it. Autosave only runs in [`ControllerMode::Active`]; before the initial
//! draft check completes, and while a recovered draft is being applied, no
//! draft writes are scheduled. Edit mode never autosaves: the draft slot only
//! holds unsaved new invitations.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::WizardError;
use super::state::{
    highest_accessible_step, is_step_accessible, missing_prerequisite, FormData, WizardState,
    WizardStep,
};
use crate::api::{
    CardDetails, EntityStore, EntityStoreError, Invitation, InvitationFields, NavigationIntent,
    Navigator, NewInvitation, PaymentOutcome, PaymentService, SaveFailureKind, TemplateCatalog,
    TemplateInfo,
};
use crate::drafts::{DraftDebouncer, DraftRecord, DraftStore};
use crate::package::{PackageGate, PackageTier, UpgradePrice};
use crate::session::{SaveAction, SessionTracker};
use crate::types::{Category, InvitationId, SessionId, TemplateId};

/// Collaborators injected into the controller
#[derive(Clone)]
pub struct WizardDeps {
    pub entities: Arc<dyn EntityStore>,
    pub catalog: Arc<dyn TemplateCatalog>,
    pub payments: Arc<dyn PaymentService>,
    pub navigator: Arc<dyn Navigator>,
    pub drafts: Arc<dyn DraftStore>,
}

#[derive(Debug, Clone)]
pub struct WizardSettings {
    /// Quiet period before a changed state is written as a draft
    pub debounce: Duration,
    /// Tier the user already holds when the wizard opens
    pub initial_tier: PackageTier,
    pub upgrade_price: UpgradePrice,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            initial_tier: PackageTier::Basic,
            upgrade_price: UpgradePrice::default(),
        }
    }
}

/// Lifecycle of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerMode {
    /// Initial draft check has not run
    Uninitialized,
    /// A recoverable draft was found and the user has not chosen yet
    AwaitingRecovery(DraftRecord),
    /// A recovered draft is being applied; autosave is off
    Restoring,
    Active,
    Disposed,
}

/// What the user is shown when a recoverable draft exists
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPrompt {
    pub saved_at: DateTime<Utc>,
    pub step: WizardStep,
    pub summary: String,
}

impl From<&DraftRecord> for RecoveryPrompt {
    fn from(record: &DraftRecord) -> Self {
        Self {
            saved_at: record.saved_at,
            step: record.snapshot.current_step,
            summary: record.snapshot.summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MountOutcome {
    /// No draft; starting empty
    Fresh,
    RecoveryOffered(RecoveryPrompt),
    /// Pre-populated from an existing invitation; recovery suppressed
    Editing(InvitationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    Moved(WizardStep),
    /// Back from the first step left the wizard
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSelection {
    pub template: TemplateId,
    pub tier: PackageTier,
    pub requires_upgrade: bool,
}

/// UI request to show the share screen for a saved invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareIntent {
    pub invitation_id: InvitationId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved {
        invitation: Invitation,
        action: SaveAction,
    },
    /// Quota or tier failure; the upgrade dialog is now visible
    UpgradeRequired(SaveFailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMode {
    /// Drop a pending draft write
    DiscardPending,
    /// Write a pending draft before tearing down
    FlushPending,
}

#[derive(Debug, Clone, PartialEq)]
enum SaveRequest {
    Create(NewInvitation),
    Update(InvitationId, InvitationFields),
}

/// A submission that has been validated and is ready to send.
///
/// Produced by [`WizardController::begin_submit`]; while it exists the
/// controller rejects further submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    action: SaveAction,
    request: SaveRequest,
}

impl PendingSave {
    pub fn action(&self) -> &SaveAction {
        &self.action
    }

    pub async fn send(self, store: &dyn EntityStore) -> CompletedSave {
        let result = match self.request {
            SaveRequest::Create(request) => store.create(request).await,
            SaveRequest::Update(id, fields) => store.update(&id, fields).await,
        };
        CompletedSave {
            action: self.action,
            result,
        }
    }
}

/// Result of sending a [`PendingSave`]
#[derive(Debug)]
pub struct CompletedSave {
    pub action: SaveAction,
    pub result: Result<Invitation, EntityStoreError>,
}

pub struct WizardController {
    deps: WizardDeps,
    state: WizardState,
    mode: ControllerMode,
    session: SessionTracker,
    gate: PackageGate,
    debouncer: DraftDebouncer,
    submitting: bool,
    share: Option<ShareIntent>,
    /// Message for the generic, retryable save failure
    last_failure: Option<String>,
}

impl WizardController {
    /// Controller for creating a new invitation
    pub fn new(deps: WizardDeps, settings: WizardSettings) -> Self {
        Self::with_session(deps, settings, SessionTracker::new())
    }

    /// Controller for editing an invitation that already exists
    pub fn editing(deps: WizardDeps, settings: WizardSettings, id: InvitationId) -> Self {
        Self::with_session(deps, settings, SessionTracker::for_existing(id))
    }

    fn with_session(deps: WizardDeps, settings: WizardSettings, session: SessionTracker) -> Self {
        let state = WizardState {
            selected_package: settings.initial_tier,
            ..WizardState::default()
        };
        Self {
            deps,
            state,
            mode: ControllerMode::Uninitialized,
            session,
            gate: PackageGate::new(settings.initial_tier, settings.upgrade_price),
            debouncer: DraftDebouncer::new(settings.debounce),
            submitting: false,
            share: None,
            last_failure: None,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn mode(&self) -> &ControllerMode {
        &self.mode
    }

    pub fn session_id(&self) -> SessionId {
        self.session.session_id()
    }

    pub fn save_action(&self) -> SaveAction {
        self.session.save_action()
    }

    pub fn created_invitation_id(&self) -> Option<&InvitationId> {
        self.session.created_invitation_id()
    }

    pub fn gate(&self) -> &PackageGate {
        &self.gate
    }

    pub fn recovery_prompt(&self) -> Option<RecoveryPrompt> {
        match &self.mode {
            ControllerMode::AwaitingRecovery(record) => Some(RecoveryPrompt::from(record)),
            _ => None,
        }
    }

    pub fn is_autosave_enabled(&self) -> bool {
        self.mode == ControllerMode::Active && self.session.editing().is_none()
    }

    pub fn has_pending_draft_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn share_intent(&self) -> Option<&ShareIntent> {
        self.share.as_ref()
    }

    pub fn dismiss_share(&mut self) {
        self.share = None;
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn is_step_accessible(&self, step: WizardStep) -> bool {
        is_step_accessible(step, &self.state)
    }

    pub fn requires_upgrade(&self, template_tier: PackageTier) -> bool {
        self.gate.requires_upgrade(template_tier)
    }

    pub fn is_upgrade_dialog_visible(&self) -> bool {
        self.gate.is_upgrade_dialog_visible()
    }

    pub fn show_upgrade_dialog(&mut self) {
        self.gate.show_upgrade_dialog();
    }

    pub fn hide_upgrade_dialog(&mut self) {
        self.gate.hide_upgrade_dialog();
    }

    // ─── Mount and draft recovery ───────────────────────────────────────────

    /// Run the one-time initial check.
    ///
    /// In edit mode the invitation is loaded and the draft slot is never
    /// consulted. Otherwise a recoverable draft is offered but not applied.
    pub async fn mount(&mut self) -> Result<MountOutcome, WizardError> {
        match self.mode {
            ControllerMode::Uninitialized => {}
            ControllerMode::Disposed => return Err(WizardError::Disposed),
            _ => return Err(WizardError::AlreadyMounted),
        }

        if let Some(id) = self.session.editing().cloned() {
            let invitation = self
                .deps
                .entities
                .get(&id)
                .await
                .map_err(|source| WizardError::Load {
                    id: id.clone(),
                    source,
                })?;

            self.state.selected_category = Some(invitation.category);
            self.state.selected_template = Some(invitation.template_id);
            self.state.form_data = Some(invitation.form_data);
            self.state.selected_package = invitation.package;
            self.gate.select(invitation.package);
            self.mode = ControllerMode::Active;

            tracing::info!(session_id = %self.session_id(), entity_id = %id, "editing existing invitation");
            return Ok(MountOutcome::Editing(id));
        }

        match self.deps.drafts.load_if_recoverable() {
            Some(record) => {
                let prompt = RecoveryPrompt::from(&record);
                tracing::info!(
                    session_id = %self.session_id(),
                    saved_at = %record.saved_at,
                    "offering draft recovery"
                );
                self.mode = ControllerMode::AwaitingRecovery(record);
                Ok(MountOutcome::RecoveryOffered(prompt))
            }
            None => {
                self.mode = ControllerMode::Active;
                tracing::debug!(session_id = %self.session_id(), "no recoverable draft");
                Ok(MountOutcome::Fresh)
            }
        }
    }

    /// Apply the offered draft.
    ///
    /// Category, template and details go in first; the step is applied last,
    /// through the same gating as navigation. No autosave happens until the
    /// whole snapshot is in place.
    pub fn restore(&mut self) -> Result<(), WizardError> {
        let record = match std::mem::replace(&mut self.mode, ControllerMode::Restoring) {
            ControllerMode::AwaitingRecovery(record) => record,
            other => {
                let err = match other {
                    ControllerMode::Disposed => WizardError::Disposed,
                    _ => WizardError::NoPendingRecovery,
                };
                self.mode = other;
                return Err(err);
            }
        };

        let snapshot = record.snapshot;
        self.apply_category(snapshot.selected_category);
        self.apply_template(snapshot.selected_template);
        self.apply_form_data(snapshot.form_data);

        let step = if is_step_accessible(snapshot.current_step, &self.state) {
            snapshot.current_step
        } else {
            let fallback = highest_accessible_step(&self.state);
            tracing::warn!(
                recorded = %snapshot.current_step,
                applied = %fallback,
                "recovered draft step is locked, falling back"
            );
            fallback
        };
        self.apply_step(step);

        self.mode = ControllerMode::Active;
        tracing::info!(session_id = %self.session_id(), step = %step, "draft restored");
        Ok(())
    }

    /// Throw away the draft and start over with an empty wizard.
    ///
    /// Answers a pending recovery prompt, or abandons work in progress. In
    /// edit mode this also stops editing; the next save creates a new
    /// invitation.
    pub fn discard(&mut self) -> Result<(), WizardError> {
        match self.mode {
            ControllerMode::AwaitingRecovery(_) | ControllerMode::Active => {}
            ControllerMode::Disposed => return Err(WizardError::Disposed),
            _ => return Err(WizardError::NoPendingRecovery),
        }

        self.debouncer.cancel();
        self.deps.drafts.clear();
        self.state = WizardState {
            selected_package: self.gate.current(),
            ..WizardState::default()
        };
        self.session.reset();
        self.share = None;
        self.last_failure = None;
        self.mode = ControllerMode::Active;

        tracing::info!(session_id = %self.session_id(), "draft discarded");
        Ok(())
    }

    // ─── State mutations ────────────────────────────────────────────────────

    /// Choose the category.
    ///
    /// Details and template are category-specific, so switching to a
    /// different category clears them.
    pub fn select_category(&mut self, category: Category) -> Result<(), WizardError> {
        self.ensure_mutable()?;

        if self.state.selected_category.is_some_and(|c| c != category)
            && (self.state.form_data.is_some() || self.state.selected_template.is_some())
        {
            tracing::debug!(%category, "category changed, clearing details and template");
            self.state.form_data = None;
            self.state.selected_template = None;
        }
        self.apply_category(Some(category));

        if !is_step_accessible(self.state.current_step, &self.state) {
            let step = highest_accessible_step(&self.state);
            self.apply_step(step);
        }
        Ok(())
    }

    /// Replace all details
    pub fn update_form_data(&mut self, form_data: FormData) -> Result<(), WizardError> {
        self.ensure_mutable()?;
        self.apply_form_data(Some(form_data));
        Ok(())
    }

    /// Set one detail field, keeping the others
    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), WizardError> {
        self.ensure_mutable()?;
        let mut form_data = self.state.form_data.clone().unwrap_or_default();
        form_data.insert(key.into(), value);
        self.apply_form_data(Some(form_data));
        Ok(())
    }

    /// Choose a template, reporting whether it needs an upgrade
    pub async fn select_template(
        &mut self,
        template: TemplateId,
    ) -> Result<TemplateSelection, WizardError> {
        self.ensure_mutable()?;

        let tier = self
            .deps
            .catalog
            .template_tier(&template)
            .await
            .map_err(WizardError::Catalog)?
            .ok_or_else(|| WizardError::UnknownTemplate(template.clone()))?;

        self.apply_template(Some(template.clone()));
        Ok(TemplateSelection {
            template,
            tier,
            requires_upgrade: self.gate.requires_upgrade(tier),
        })
    }

    /// Choose the package for this invitation.
    ///
    /// Picking gold while holding basic opens the upgrade dialog instead and
    /// returns `false`.
    pub fn select_package(&mut self, tier: PackageTier) -> Result<bool, WizardError> {
        self.ensure_mutable()?;

        if self.gate.requires_upgrade(tier) {
            self.gate.show_upgrade_dialog();
            return Ok(false);
        }
        self.gate.select(tier);
        self.state.selected_package = tier;
        Ok(true)
    }

    /// Pay for the gold upgrade through the payment collaborator
    pub async fn confirm_payment(
        &mut self,
        card: CardDetails,
    ) -> Result<PaymentOutcome, WizardError> {
        self.ensure_not_disposed()?;

        let payments = Arc::clone(&self.deps.payments);
        let outcome = self.gate.confirm_payment(payments.as_ref(), card).await;
        if outcome.success {
            self.state.selected_package = self.gate.current();
        }
        Ok(outcome)
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    /// Move to `step` if its prerequisites are met
    pub fn set_current_step(&mut self, step: WizardStep) -> Result<(), WizardError> {
        self.ensure_mutable()?;
        if let Some(missing) = missing_prerequisite(step, &self.state) {
            tracing::debug!(%step, missing, "step locked");
            return Err(WizardError::StepLocked { step, missing });
        }
        self.apply_step(step);
        Ok(())
    }

    /// Jump from the step indicator; same rules as sequential navigation
    pub fn jump_to(&mut self, step: WizardStep) -> Result<(), WizardError> {
        self.set_current_step(step)
    }

    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_mutable()?;
        let next = self
            .state
            .current_step
            .next()
            .ok_or(WizardError::AtLastStep)?;
        self.set_current_step(next)?;
        Ok(next)
    }

    /// Step back; from the first step this leaves the wizard
    pub fn retreat(&mut self) -> Result<Retreat, WizardError> {
        self.ensure_mutable()?;

        let target = match self.state.current_step {
            WizardStep::Category => {
                self.deps.navigator.navigate(NavigationIntent::Exit);
                return Ok(Retreat::Exited);
            }
            // Preview and Customize pair up: back always lands on the
            // step that owns the editable content
            WizardStep::Preview => WizardStep::Customize,
            WizardStep::Customize => WizardStep::TemplateChoice,
            WizardStep::TemplateChoice => WizardStep::Details,
            WizardStep::Details => WizardStep::Category,
        };
        self.set_current_step(target)?;
        Ok(Retreat::Moved(target))
    }

    /// Abandon the session and head to the dashboard
    pub fn go_to_dashboard(&mut self) {
        if let Some(snapshot) = self.debouncer.flush() {
            self.deps.drafts.save(self.session.session_id(), &snapshot);
        }
        self.session.clear_session();
        self.deps.navigator.navigate(NavigationIntent::Dashboard);
    }

    // ─── Autosave ───────────────────────────────────────────────────────────

    /// Write the pending draft if its quiet period has elapsed
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.mode != ControllerMode::Active {
            return false;
        }
        match self.debouncer.poll(now) {
            Some(snapshot) => {
                self.deps.drafts.save(self.session.session_id(), &snapshot);
                true
            }
            None => false,
        }
    }

    /// Write the pending draft immediately
    pub fn flush_draft(&mut self) -> bool {
        if self.mode != ControllerMode::Active {
            return false;
        }
        match self.debouncer.flush() {
            Some(snapshot) => {
                self.deps.drafts.save(self.session.session_id(), &snapshot);
                true
            }
            None => false,
        }
    }

    /// Tear down. After this no draft write can escape and every operation
    /// fails with [`WizardError::Disposed`].
    pub fn dispose(&mut self, mode: DisposeMode) {
        match mode {
            DisposeMode::FlushPending => {
                self.flush_draft();
            }
            DisposeMode::DiscardPending => {
                if self.debouncer.cancel() {
                    tracing::debug!("dropped pending draft write on dispose");
                }
            }
        }
        self.debouncer.cancel();
        self.mode = ControllerMode::Disposed;
    }

    // ─── Catalog ────────────────────────────────────────────────────────────

    /// Templates for the selected category, including ones that need gold
    pub async fn available_templates(&self) -> Result<Vec<TemplateInfo>, WizardError> {
        self.ensure_not_disposed()?;
        let category = self
            .state
            .selected_category
            .ok_or_else(|| WizardError::PreconditionFailed {
                missing: vec!["category"],
            })?;
        self.deps
            .catalog
            .templates(category, None)
            .await
            .map_err(WizardError::Catalog)
    }

    // ─── Submission ─────────────────────────────────────────────────────────

    /// Validate and build the save request, marking a submission in flight
    pub fn begin_submit(&mut self) -> Result<PendingSave, WizardError> {
        match self.mode {
            ControllerMode::Active => {}
            ControllerMode::Disposed => return Err(WizardError::Disposed),
            _ => return Err(WizardError::NotReady),
        }
        if self.submitting {
            return Err(WizardError::SubmitInFlight);
        }

        let (Some(category), Some(template_id), Some(form_data)) = (
            self.state.selected_category,
            self.state.selected_template.clone(),
            self.state.form_data.clone(),
        ) else {
            let missing = self.state.missing_for_submit();
            tracing::error!(?missing, "submit called before the wizard was complete");
            return Err(WizardError::PreconditionFailed { missing });
        };
        let package = self.state.selected_package;

        let action = self.session.save_action();
        let request = match &action {
            SaveAction::Create => SaveRequest::Create(NewInvitation {
                category,
                form_data,
                package,
                template_id,
            }),
            SaveAction::SessionUpdate(id) | SaveAction::EditUpdate(id) => SaveRequest::Update(
                id.clone(),
                InvitationFields {
                    category: Some(category),
                    form_data: Some(form_data),
                    package: Some(package),
                    template_id: Some(template_id),
                },
            ),
        };

        self.submitting = true;
        self.last_failure = None;
        tracing::debug!(session_id = %self.session_id(), ?action, "submitting invitation");
        Ok(PendingSave { action, request })
    }

    /// Apply the result of a sent [`PendingSave`]
    pub fn complete_submit(
        &mut self,
        completed: CompletedSave,
    ) -> Result<SubmitOutcome, WizardError> {
        self.submitting = false;
        let CompletedSave { action, result } = completed;

        match result {
            Ok(invitation) => {
                if action.is_create() {
                    self.session.mark_created(invitation.id.clone());
                }
                // Saved server-side; the local draft is redundant now. Edits
                // never write the slot, so it belongs to someone else.
                self.debouncer.cancel();
                if !matches!(action, SaveAction::EditUpdate(_)) {
                    self.deps.drafts.clear();
                }
                self.share = Some(ShareIntent {
                    invitation_id: invitation.id.clone(),
                });

                tracing::info!(
                    session_id = %self.session_id(),
                    entity_id = %invitation.id,
                    ?action,
                    "invitation saved"
                );
                Ok(SubmitOutcome::Saved { invitation, action })
            }
            Err(err) => {
                let kind = err.kind();
                if kind.needs_upgrade() {
                    tracing::warn!(error = %err, "save needs a package upgrade");
                    self.gate.show_upgrade_dialog();
                    Ok(SubmitOutcome::UpgradeRequired(kind))
                } else {
                    tracing::error!(error = %err, "save failed");
                    self.last_failure = Some(err.to_string());
                    Err(WizardError::SaveFailed(err))
                }
            }
        }
    }

    /// Create or update the invitation, depending on the session.
    ///
    /// The draft is only cleared on success; on any failure both the state
    /// and the draft are left as they were.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, WizardError> {
        let pending = self.begin_submit()?;
        let entities = Arc::clone(&self.deps.entities);

        // Dropping this future mid-send must not leave the flag stuck
        let guard = InFlight { controller: self };
        let completed = pending.send(entities.as_ref()).await;
        guard.controller.complete_submit(completed)
    }

    /// Abandon a [`PendingSave`] that will not be sent
    pub fn cancel_submit(&mut self, pending: PendingSave) {
        tracing::debug!(action = ?pending.action, "submission abandoned");
        self.submitting = false;
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn ensure_not_disposed(&self) -> Result<(), WizardError> {
        if self.mode == ControllerMode::Disposed {
            return Err(WizardError::Disposed);
        }
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), WizardError> {
        match self.mode {
            ControllerMode::Active | ControllerMode::Restoring => Ok(()),
            ControllerMode::Disposed => Err(WizardError::Disposed),
            ControllerMode::Uninitialized | ControllerMode::AwaitingRecovery(_) => {
                Err(WizardError::NotReady)
            }
        }
    }

    fn apply_category(&mut self, category: Option<Category>) {
        self.state.selected_category = category;
        self.state_changed();
    }

    fn apply_template(&mut self, template: Option<TemplateId>) {
        self.state.selected_template = template;
        self.state_changed();
    }

    fn apply_form_data(&mut self, form_data: Option<FormData>) {
        self.state.form_data = form_data;
        self.state_changed();
    }

    fn apply_step(&mut self, step: WizardStep) {
        self.state.current_step = step;
        self.state_changed();
    }

    /// Schedule a draft write, unless the initial check is pending, a
    /// restore is in progress or an existing invitation is being edited
    fn state_changed(&mut self) {
        if self.is_autosave_enabled() {
            self.debouncer.schedule(self.state.clone(), Instant::now());
        }
    }
}

/// Clears the in-flight flag when a submission ends, however it ends
struct InFlight<'a> {
    controller: &'a mut WizardController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.controller.submitting {
            tracing::warn!("submission dropped before completing");
            self.controller.submitting = false;
        }
    }
}
