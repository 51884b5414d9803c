use thiserror::Error;

use super::state::WizardStep;
use crate::api::EntityStoreError;
use crate::types::{InvitationId, TemplateId};

/// Errors returned by wizard controller operations
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("step {step} is locked until a {missing} is provided")]
    StepLocked {
        step: WizardStep,
        missing: &'static str,
    },

    #[error("already on the last step")]
    AtLastStep,

    #[error("cannot submit, missing: {}", .missing.join(", "))]
    PreconditionFailed { missing: Vec<&'static str> },

    #[error("a submission is already in flight")]
    SubmitInFlight,

    #[error("wizard is not ready: the initial draft check has not completed")]
    NotReady,

    #[error("wizard has already been mounted")]
    AlreadyMounted,

    #[error("no draft recovery is pending")]
    NoPendingRecovery,

    #[error("wizard has been disposed")]
    Disposed,

    #[error("unknown template '{0}'")]
    UnknownTemplate(TemplateId),

    #[error("failed to save invitation: {0}")]
    SaveFailed(#[source] EntityStoreError),

    #[error("failed to load invitation '{id}': {source}")]
    Load {
        id: InvitationId,
        source: EntityStoreError,
    },

    #[error("template catalog unavailable: {0}")]
    Catalog(#[source] EntityStoreError),
}

impl WizardError {
    /// Failures the user can retry without re-entering anything
    pub fn is_retryable(&self) -> bool {
        matches!(self, WizardError::SaveFailed(_) | WizardError::Catalog(_))
    }
}
