//! Identifier and category types shared by the wizard, the draft store and the
//! backend collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifies one wizard mount. Generated once per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Backend identifier of a persisted invitation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(String);

impl InvitationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InvitationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Catalog identifier of an invitation template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind of event an invitation is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Wedding,
    Engagement,
    Birthday,
    BabyShower,
    Anniversary,
    Graduation,
    Corporate,
    Other,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Wedding,
            Category::Engagement,
            Category::Birthday,
            Category::BabyShower,
            Category::Anniversary,
            Category::Graduation,
            Category::Corporate,
            Category::Other,
        ]
    }

    /// Stable key used in storage and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Category::Wedding => "wedding",
            Category::Engagement => "engagement",
            Category::Birthday => "birthday",
            Category::BabyShower => "baby_shower",
            Category::Anniversary => "anniversary",
            Category::Graduation => "graduation",
            Category::Corporate => "corporate",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Wedding => "Wedding",
            Category::Engagement => "Engagement",
            Category::Birthday => "Birthday",
            Category::BabyShower => "Baby Shower",
            Category::Anniversary => "Anniversary",
            Category::Graduation => "Graduation",
            Category::Corporate => "Corporate Event",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::all()
            .iter()
            .copied()
            .find(|c| c.key() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Category::all().iter().map(Category::key).collect();
                format!("unknown category '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parses_hyphenated_and_mixed_case() {
        assert_eq!("Baby-Shower".parse::<Category>(), Ok(Category::BabyShower));
        assert_eq!("wedding".parse::<Category>(), Ok(Category::Wedding));
    }

    #[test]
    fn test_category_rejects_unknown() {
        let err = "funeral".parse::<Category>().unwrap_err();
        assert!(err.contains("funeral"));
        assert!(err.contains("wedding"));
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::BabyShower).unwrap();
        assert_eq!(json, "\"baby_shower\"");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = InvitationId::new("inv-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"inv-1\"");
        let template: TemplateId = serde_json::from_str("\"rose-gold\"").unwrap();
        assert_eq!(template.as_str(), "rose-gold");
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
