//! External collaborators the wizard calls out to.
//!
//! The controller only talks to these traits. `local` provides file-backed
//! implementations for the CLI and `mock` provides scripted ones for tests.

pub mod catalog;
pub mod error;
pub mod local;
pub mod mock;
pub mod payment;

pub use catalog::StaticCatalog;
pub use error::{EntityStoreError, SaveFailureKind};
pub use local::LocalEntityStore;
pub use payment::LocalPaymentService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::package::PackageTier;
use crate::types::{Category, InvitationId, TemplateId};
use crate::wizard::FormData;

/// Backend-persisted invitation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub category: Category,
    pub template_id: TemplateId,
    pub package: PackageTier,
    pub form_data: FormData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvitation {
    pub category: Category,
    pub form_data: FormData,
    pub package: PackageTier,
    pub template_id: TemplateId,
}

/// Fields to change on an existing invitation. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvitationFields {
    pub category: Option<Category>,
    pub form_data: Option<FormData>,
    pub package: Option<PackageTier>,
    pub template_id: Option<TemplateId>,
}

/// Catalog entry for an invitation template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub name: String,
    pub categories: Vec<Category>,
    pub required_tier: PackageTier,
}

impl TemplateInfo {
    pub fn supports(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Card used to pay for an upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub holder: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub card: CardDetails,
    pub amount_cents: u64,
    pub currency: String,
    /// Tier being purchased
    pub tier: PackageTier,
}

/// Structured payment result; failures are data, not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub reference: Option<String>,
}

impl PaymentOutcome {
    pub fn succeeded(reference: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            reference: Some(reference.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            reference: None,
        }
    }
}

/// Fire-and-forget navigation requests from the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Leave the wizard (back from the first step)
    Exit,
    Dashboard,
}

/// Backend entity store for invitations
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(&self, request: NewInvitation) -> Result<Invitation, EntityStoreError>;

    async fn update(
        &self,
        id: &InvitationId,
        fields: InvitationFields,
    ) -> Result<Invitation, EntityStoreError>;

    /// Fetch a stored invitation, used to pre-populate edit mode
    async fn get(&self, id: &InvitationId) -> Result<Invitation, EntityStoreError>;
}

/// Read-only template catalog
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// Templates for a category. With a tier, only those usable at that tier.
    async fn templates(
        &self,
        category: Category,
        tier: Option<PackageTier>,
    ) -> Result<Vec<TemplateInfo>, EntityStoreError>;

    /// Required tier of a template, `None` if the catalog doesn't know it
    async fn template_tier(&self, id: &TemplateId)
        -> Result<Option<PackageTier>, EntityStoreError>;
}

/// Payment confirmation service
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn submit(&self, details: PaymentDetails) -> PaymentOutcome;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, intent: NavigationIntent);
}

/// Navigator for headless use; intents only show up in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, intent: NavigationIntent) {
        tracing::info!(?intent, "navigation requested");
    }
}
