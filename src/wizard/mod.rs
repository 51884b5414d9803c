//! The invitation creation wizard

pub mod controller;
pub mod error;
pub mod state;

pub use controller::{
    CompletedSave, ControllerMode, DisposeMode, MountOutcome, PendingSave, RecoveryPrompt,
    Retreat, ShareIntent, SubmitOutcome, TemplateSelection, WizardController, WizardDeps,
    WizardSettings,
};
pub use error::WizardError;
pub use state::{
    first_locked_step, highest_accessible_step, is_step_accessible, missing_prerequisite,
    FormData, WizardState, WizardStep,
};
