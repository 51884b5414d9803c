//! Wizard snapshot and step gating

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::package::PackageTier;
use crate::types::{Category, TemplateId};

/// Free-form, category-specific details entered on the details step
pub type FormData = serde_json::Map<String, serde_json::Value>;

/// Steps in the invitation wizard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WizardStep {
    /// Pick what the invitation is for
    #[default]
    Category,
    /// Fill in the category-specific details
    Details,
    /// Pick a template from the catalog
    TemplateChoice,
    /// Adjust the chosen template
    Customize,
    /// Final preview and submission
    Preview,
}

impl WizardStep {
    pub fn all() -> &'static [WizardStep] {
        &[
            WizardStep::Category,
            WizardStep::Details,
            WizardStep::TemplateChoice,
            WizardStep::Customize,
            WizardStep::Preview,
        ]
    }

    /// 1-based position shown in the step indicator
    pub fn number(self) -> u8 {
        match self {
            WizardStep::Category => 1,
            WizardStep::Details => 2,
            WizardStep::TemplateChoice => 3,
            WizardStep::Customize => 4,
            WizardStep::Preview => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        WizardStep::all().iter().copied().find(|s| s.number() == n)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Category => "Category",
            WizardStep::Details => "Details",
            WizardStep::TemplateChoice => "Template",
            WizardStep::Customize => "Customize",
            WizardStep::Preview => "Preview",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.number())
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        WizardStep::from_number(n).ok_or_else(|| format!("wizard step {} is out of range 1..=5", n))
    }
}

/// Canonical snapshot of in-progress wizard work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step: WizardStep,
    pub selected_category: Option<Category>,
    pub selected_template: Option<TemplateId>,
    #[serde(default)]
    pub selected_package: PackageTier,
    pub form_data: Option<FormData>,
}

impl WizardState {
    /// True when nothing has been entered yet
    pub fn is_empty(&self) -> bool {
        self.selected_category.is_none()
            && self.selected_template.is_none()
            && self.form_data.is_none()
            && self.current_step == WizardStep::Category
    }

    /// Fields still required before the invitation can be submitted
    pub fn missing_for_submit(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.selected_category.is_none() {
            missing.push("category");
        }
        if self.form_data.is_none() {
            missing.push("details");
        }
        if self.selected_template.is_none() {
            missing.push("template");
        }
        missing
    }

    /// One-line description for recovery prompts and CLI output
    pub fn summary(&self) -> String {
        let category = self
            .selected_category
            .map(|c| c.label().to_string())
            .unwrap_or_else(|| "no category".to_string());
        let template = self
            .selected_template
            .as_ref()
            .map(|t| format!("template {}", t))
            .unwrap_or_else(|| "no template".to_string());
        let fields = self.form_data.as_ref().map_or(0, serde_json::Map::len);
        format!(
            "{}, {}, {} detail field(s), at {}",
            category, template, fields, self.current_step
        )
    }
}

/// The first unmet prerequisite for entering `step`, if any.
///
/// Each step requires everything the previous one does.
pub fn missing_prerequisite(step: WizardStep, state: &WizardState) -> Option<&'static str> {
    match step {
        WizardStep::Category => None,
        WizardStep::Details => state.selected_category.is_none().then_some("category"),
        WizardStep::TemplateChoice => missing_prerequisite(WizardStep::Details, state)
            .or_else(|| state.form_data.is_none().then_some("details")),
        WizardStep::Customize => missing_prerequisite(WizardStep::TemplateChoice, state)
            .or_else(|| state.selected_template.is_none().then_some("template")),
        WizardStep::Preview => missing_prerequisite(WizardStep::Customize, state),
    }
}

/// Single gating rule for both sequential and jump navigation
pub fn is_step_accessible(step: WizardStep, state: &WizardState) -> bool {
    missing_prerequisite(step, state).is_none()
}

/// Furthest step the user may currently jump to
pub fn highest_accessible_step(state: &WizardState) -> WizardStep {
    WizardStep::all()
        .iter()
        .copied()
        .take_while(|s| is_step_accessible(*s, state))
        .last()
        .unwrap_or_default()
}

/// Lowest step whose prerequisites are unmet, if any
pub fn first_locked_step(state: &WizardState) -> Option<WizardStep> {
    WizardStep::all()
        .iter()
        .copied()
        .find(|s| !is_step_accessible(*s, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details() -> FormData {
        let mut data = FormData::new();
        data.insert("bride".to_string(), json!("A"));
        data
    }

    #[test]
    fn test_category_step_always_accessible() {
        assert!(is_step_accessible(WizardStep::Category, &WizardState::default()));
    }

    #[test]
    fn test_steps_require_cumulative_prerequisites() {
        let mut state = WizardState::default();
        assert!(!is_step_accessible(WizardStep::Details, &state));

        state.selected_category = Some(Category::Wedding);
        assert!(is_step_accessible(WizardStep::Details, &state));
        assert!(!is_step_accessible(WizardStep::TemplateChoice, &state));

        state.form_data = Some(details());
        assert!(is_step_accessible(WizardStep::TemplateChoice, &state));
        assert!(!is_step_accessible(WizardStep::Customize, &state));
        assert!(!is_step_accessible(WizardStep::Preview, &state));

        state.selected_template = Some(TemplateId::new("classic"));
        assert!(is_step_accessible(WizardStep::Customize, &state));
        assert!(is_step_accessible(WizardStep::Preview, &state));
    }

    #[test]
    fn test_template_without_category_does_not_unlock() {
        let state = WizardState {
            selected_template: Some(TemplateId::new("classic")),
            form_data: Some(details()),
            ..WizardState::default()
        };
        assert_eq!(
            missing_prerequisite(WizardStep::Preview, &state),
            Some("category")
        );
    }

    #[test]
    fn test_highest_and_first_locked() {
        let mut state = WizardState::default();
        assert_eq!(highest_accessible_step(&state), WizardStep::Category);
        assert_eq!(first_locked_step(&state), Some(WizardStep::Details));

        state.selected_category = Some(Category::Birthday);
        state.form_data = Some(details());
        assert_eq!(highest_accessible_step(&state), WizardStep::TemplateChoice);
        assert_eq!(first_locked_step(&state), Some(WizardStep::Customize));

        state.selected_template = Some(TemplateId::new("confetti"));
        assert_eq!(highest_accessible_step(&state), WizardStep::Preview);
        assert_eq!(first_locked_step(&state), None);
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(WizardStep::from_number(0), None);
        assert_eq!(WizardStep::from_number(3), Some(WizardStep::TemplateChoice));
        assert_eq!(WizardStep::from_number(6), None);
        assert_eq!(WizardStep::Preview.next(), None);
        assert_eq!(WizardStep::Category.prev(), None);
        assert_eq!(WizardStep::Customize.prev(), Some(WizardStep::TemplateChoice));
    }

    #[test]
    fn test_step_serializes_as_number() {
        let state = WizardState {
            current_step: WizardStep::TemplateChoice,
            ..WizardState::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["current_step"], json!(3));
        assert_eq!(value["selected_package"], json!("basic"));
    }

    #[test]
    fn test_out_of_range_step_fails_to_parse() {
        let raw = r#"{"current_step":9,"selected_category":null,"selected_template":null,"form_data":null}"#;
        assert!(serde_json::from_str::<WizardState>(raw).is_err());
    }

    #[test]
    fn test_missing_for_submit() {
        let state = WizardState {
            selected_category: Some(Category::Wedding),
            ..WizardState::default()
        };
        assert_eq!(state.missing_for_submit(), vec!["details", "template"]);
        assert!(!state.is_empty());
        assert!(WizardState::default().is_empty());
    }
}
