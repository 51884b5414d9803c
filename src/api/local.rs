//! File-backed entity store used by the CLI.
//!
//! Invitations and the account tier live in a single JSON file in the state
//! directory. Quotas and template access are enforced here, the way a hosted
//! backend would enforce them.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{
    EntityStore, EntityStoreError, Invitation, InvitationFields, NewInvitation, TemplateCatalog,
};
use crate::package::PackageTier;
use crate::types::{InvitationId, TemplateId};

/// Invitation count allowed per account tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub basic: usize,
    pub gold: usize,
}

impl QuotaLimits {
    pub fn for_tier(&self, tier: PackageTier) -> usize {
        match tier {
            PackageTier::Basic => self.basic,
            PackageTier::Gold => self.gold,
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self { basic: 1, gold: 25 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    account_tier: PackageTier,
    #[serde(default)]
    invitations: Vec<Invitation>,
}

pub struct LocalEntityStore {
    path: PathBuf,
    catalog: Arc<dyn TemplateCatalog>,
    quotas: QuotaLimits,
    lock: Mutex<()>,
}

impl LocalEntityStore {
    pub fn new(path: impl Into<PathBuf>, catalog: Arc<dyn TemplateCatalog>, quotas: QuotaLimits) -> Self {
        Self {
            path: path.into(),
            catalog,
            quotas,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreFile, EntityStoreError> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self, file: &StoreFile) -> Result<(), EntityStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(file)?;

        // Write aside and rename so a crash never leaves a torn store file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Run `f` against the store file under the lock, persisting the result
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut StoreFile) -> Result<T, EntityStoreError>,
    ) -> Result<T, EntityStoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| EntityStoreError::unexpected("entity store lock poisoned"))?;
        let mut file = self.read()?;
        let value = f(&mut file)?;
        self.write(&file)?;
        Ok(value)
    }

    pub fn account_tier(&self) -> Result<PackageTier, EntityStoreError> {
        Ok(self.read()?.account_tier)
    }

    /// Record a purchased tier for the account
    pub fn set_account_tier(&self, tier: PackageTier) -> Result<(), EntityStoreError> {
        self.modify(|file| {
            file.account_tier = tier;
            Ok(())
        })?;
        tracing::info!(%tier, "account tier updated");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Invitation>, EntityStoreError> {
        Ok(self.read()?.invitations)
    }

    async fn required_tier(&self, template: &TemplateId) -> Result<PackageTier, EntityStoreError> {
        self.catalog
            .template_tier(template)
            .await?
            .ok_or_else(|| EntityStoreError::unexpected(format!("unknown template '{}'", template)))
    }
}

fn check_access(
    template: &TemplateId,
    required: PackageTier,
    account: PackageTier,
) -> Result<(), EntityStoreError> {
    if required > account {
        return Err(EntityStoreError::TemplateAccessDenied {
            template: template.clone(),
            required,
        });
    }
    Ok(())
}

#[async_trait]
impl EntityStore for LocalEntityStore {
    async fn create(&self, request: NewInvitation) -> Result<Invitation, EntityStoreError> {
        let required = self.required_tier(&request.template_id).await?;
        let quotas = self.quotas;

        let invitation = self.modify(|file| {
            check_access(&request.template_id, required, file.account_tier)?;

            let limit = quotas.for_tier(file.account_tier);
            if file.invitations.len() >= limit {
                return Err(EntityStoreError::QuotaExceeded {
                    tier: file.account_tier,
                    limit,
                });
            }

            let now = Utc::now();
            let invitation = Invitation {
                id: InvitationId::new(format!("inv-{}", Uuid::new_v4().simple())),
                category: request.category,
                template_id: request.template_id,
                package: request.package,
                form_data: request.form_data,
                created_at: now,
                updated_at: now,
            };
            file.invitations.push(invitation.clone());
            Ok(invitation)
        })?;

        tracing::info!(entity_id = %invitation.id, "invitation created");
        Ok(invitation)
    }

    async fn update(
        &self,
        id: &InvitationId,
        fields: InvitationFields,
    ) -> Result<Invitation, EntityStoreError> {
        let required = match &fields.template_id {
            Some(template) => Some(self.required_tier(template).await?),
            None => None,
        };

        let invitation = self.modify(|file| {
            let account = file.account_tier;
            let invitation = file
                .invitations
                .iter_mut()
                .find(|i| &i.id == id)
                .ok_or_else(|| EntityStoreError::NotFound(id.clone()))?;

            if let (Some(template), Some(required)) = (&fields.template_id, required) {
                check_access(template, required, account)?;
            }

            if let Some(category) = fields.category {
                invitation.category = category;
            }
            if let Some(form_data) = fields.form_data {
                invitation.form_data = form_data;
            }
            if let Some(package) = fields.package {
                invitation.package = package;
            }
            if let Some(template) = fields.template_id {
                invitation.template_id = template;
            }
            invitation.updated_at = Utc::now();
            Ok(invitation.clone())
        })?;

        tracing::info!(entity_id = %invitation.id, "invitation updated");
        Ok(invitation)
    }

    async fn get(&self, id: &InvitationId) -> Result<Invitation, EntityStoreError> {
        self.read()?
            .invitations
            .into_iter()
            .find(|i| &i.id == id)
            .ok_or_else(|| EntityStoreError::NotFound(id.clone()))
    }
}
