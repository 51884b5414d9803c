//! Backend error types with save-failure classification

use thiserror::Error;

use crate::package::PackageTier;
use crate::types::{InvitationId, TemplateId};

/// Errors surfaced by the entity store and template catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityStoreError {
    /// The account's tier has reached its invitation-count limit
    #[error("invitation quota of {limit} reached for the {tier} package")]
    QuotaExceeded { tier: PackageTier, limit: usize },

    /// The chosen template needs a higher tier than the account holds
    #[error("template '{template}' requires the {required} package")]
    TemplateAccessDenied {
        template: TemplateId,
        required: PackageTier,
    },

    #[error("invitation '{0}' not found")]
    NotFound(InvitationId),

    #[error("unexpected backend failure: {0}")]
    Unexpected(String),
}

/// How a failed save should be remediated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFailureKind {
    QuotaExceeded,
    TemplateAccessDenied,
    UnexpectedSaveFailure,
}

impl SaveFailureKind {
    /// Quota and tier failures are both resolved by upgrading
    pub fn needs_upgrade(&self) -> bool {
        matches!(
            self,
            SaveFailureKind::QuotaExceeded | SaveFailureKind::TemplateAccessDenied
        )
    }
}

impl EntityStoreError {
    pub fn kind(&self) -> SaveFailureKind {
        match self {
            EntityStoreError::QuotaExceeded { .. } => SaveFailureKind::QuotaExceeded,
            EntityStoreError::TemplateAccessDenied { .. } => SaveFailureKind::TemplateAccessDenied,
            EntityStoreError::NotFound(_) | EntityStoreError::Unexpected(_) => {
                SaveFailureKind::UnexpectedSaveFailure
            }
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        EntityStoreError::Unexpected(message.into())
    }
}

impl From<std::io::Error> for EntityStoreError {
    fn from(err: std::io::Error) -> Self {
        EntityStoreError::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for EntityStoreError {
    fn from(err: serde_json::Error) -> Self {
        EntityStoreError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_and_access_need_upgrade() {
        let quota = EntityStoreError::QuotaExceeded {
            tier: PackageTier::Basic,
            limit: 1,
        };
        let access = EntityStoreError::TemplateAccessDenied {
            template: TemplateId::new("gilded"),
            required: PackageTier::Gold,
        };

        assert_eq!(quota.kind(), SaveFailureKind::QuotaExceeded);
        assert_eq!(access.kind(), SaveFailureKind::TemplateAccessDenied);
        assert!(quota.kind().needs_upgrade());
        assert!(access.kind().needs_upgrade());
    }

    #[test]
    fn test_other_failures_are_unexpected() {
        let missing = EntityStoreError::NotFound(InvitationId::new("inv-1"));
        let boom = EntityStoreError::unexpected("connection reset");

        assert_eq!(missing.kind(), SaveFailureKind::UnexpectedSaveFailure);
        assert!(!boom.kind().needs_upgrade());
    }

    #[test]
    fn test_messages() {
        let access = EntityStoreError::TemplateAccessDenied {
            template: TemplateId::new("gilded"),
            required: PackageTier::Gold,
        };
        assert_eq!(
            access.to_string(),
            "template 'gilded' requires the gold package"
        );
    }
}
