//! Package tier selection and the upgrade dialog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::{CardDetails, PaymentDetails, PaymentOutcome, PaymentService};

/// Entitlement level that gates template access and quota
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    #[default]
    Basic,
    Gold,
}

impl PackageTier {
    pub fn label(&self) -> &'static str {
        match self {
            PackageTier::Basic => "Basic",
            PackageTier::Gold => "Gold",
        }
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageTier::Basic => f.write_str("basic"),
            PackageTier::Gold => f.write_str("gold"),
        }
    }
}

impl FromStr for PackageTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(PackageTier::Basic),
            "gold" => Ok(PackageTier::Gold),
            other => Err(format!("unknown package '{}' (expected basic or gold)", other)),
        }
    }
}

/// Price charged for raising a basic account to gold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePrice {
    pub amount_cents: u64,
    pub currency: String,
}

impl Default for UpgradePrice {
    fn default() -> Self {
        Self {
            amount_cents: 4900,
            currency: "USD".to_string(),
        }
    }
}

/// Tracks the selected tier and whether the upgrade dialog is showing
#[derive(Debug, Clone)]
pub struct PackageGate {
    tier: PackageTier,
    upgrade_dialog_visible: bool,
    /// Error from the most recent failed payment, shown inside the dialog
    payment_error: Option<String>,
    price: UpgradePrice,
}

impl PackageGate {
    pub fn new(tier: PackageTier, price: UpgradePrice) -> Self {
        Self {
            tier,
            upgrade_dialog_visible: false,
            payment_error: None,
            price,
        }
    }

    pub fn select(&mut self, tier: PackageTier) {
        self.tier = tier;
    }

    pub fn current(&self) -> PackageTier {
        self.tier
    }

    /// A gold template needs an upgrade while the user holds basic
    pub fn requires_upgrade(&self, template_tier: PackageTier) -> bool {
        template_tier == PackageTier::Gold && self.tier == PackageTier::Basic
    }

    pub fn show_upgrade_dialog(&mut self) {
        self.upgrade_dialog_visible = true;
    }

    pub fn hide_upgrade_dialog(&mut self) {
        self.upgrade_dialog_visible = false;
        self.payment_error = None;
    }

    pub fn is_upgrade_dialog_visible(&self) -> bool {
        self.upgrade_dialog_visible
    }

    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    pub fn price(&self) -> &UpgradePrice {
        &self.price
    }

    /// Submit payment for the gold upgrade.
    ///
    /// On success the tier is raised to gold and the dialog closes. On failure
    /// the dialog stays open with the error so the user can retry.
    pub async fn confirm_payment(
        &mut self,
        service: &dyn PaymentService,
        card: CardDetails,
    ) -> PaymentOutcome {
        let details = PaymentDetails {
            card,
            amount_cents: self.price.amount_cents,
            currency: self.price.currency.clone(),
            tier: PackageTier::Gold,
        };

        let outcome = service.submit(details).await;
        if outcome.success {
            tracing::info!(reference = ?outcome.reference, "gold upgrade confirmed");
            self.tier = PackageTier::Gold;
            self.hide_upgrade_dialog();
        } else {
            tracing::warn!(error = ?outcome.error, "payment failed, keeping upgrade dialog open");
            self.payment_error = outcome.error.clone();
            self.upgrade_dialog_visible = true;
        }
        outcome
    }
}

impl Default for PackageGate {
    fn default() -> Self {
        Self::new(PackageTier::Basic, UpgradePrice::default())
    }
}
