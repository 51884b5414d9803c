//! Local payment confirmation.
//!
//! Validates card details the way a checkout form would and issues a
//! reference for accepted payments. No money moves.

use async_trait::async_trait;
use uuid::Uuid;

use super::{PaymentDetails, PaymentOutcome, PaymentService};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPaymentService;

impl LocalPaymentService {
    pub fn new() -> Self {
        Self
    }
}

/// Luhn checksum over a string of ASCII digits
fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

fn validate(details: &PaymentDetails) -> Result<(), String> {
    if details.card.holder.trim().is_empty() {
        return Err("card holder name is required".to_string());
    }

    let digits: String = details
        .card
        .number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("card number must be 13 to 19 digits".to_string());
    }
    if !luhn_valid(&digits) {
        return Err("card number is invalid".to_string());
    }

    if details.amount_cents == 0 {
        return Err("payment amount must be positive".to_string());
    }
    Ok(())
}

#[async_trait]
impl PaymentService for LocalPaymentService {
    async fn submit(&self, details: PaymentDetails) -> PaymentOutcome {
        match validate(&details) {
            Ok(()) => {
                let reference = format!("pay-{}", Uuid::new_v4().simple());
                tracing::info!(
                    %reference,
                    amount_cents = details.amount_cents,
                    currency = %details.currency,
                    "payment accepted"
                );
                PaymentOutcome::succeeded(reference)
            }
            Err(error) => {
                tracing::warn!(%error, "payment rejected");
                PaymentOutcome::failed(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CardDetails;
    use crate::package::PackageTier;

    fn details(holder: &str, number: &str) -> PaymentDetails {
        PaymentDetails {
            card: CardDetails {
                holder: holder.to_string(),
                number: number.to_string(),
            },
            amount_cents: 4900,
            currency: "USD".to_string(),
            tier: PackageTier::Gold,
        }
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4242424242424242"));
        assert!(!luhn_valid("4242424242424241"));
    }

    #[tokio::test]
    async fn test_accepts_valid_card_with_separators() {
        let outcome = LocalPaymentService::new()
            .submit(details("Ada", "4242-4242 4242-4242"))
            .await;
        assert!(outcome.success);
        assert!(outcome.reference.unwrap().starts_with("pay-"));
    }

    #[tokio::test]
    async fn test_rejects_missing_holder() {
        let outcome = LocalPaymentService::new()
            .submit(details("  ", "4242424242424242"))
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("card holder name is required"));
    }

    #[tokio::test]
    async fn test_rejects_bad_numbers() {
        let service = LocalPaymentService::new();
        let short = service.submit(details("Ada", "4242")).await;
        assert_eq!(
            short.error.as_deref(),
            Some("card number must be 13 to 19 digits")
        );

        let checksum = service.submit(details("Ada", "4242424242424241")).await;
        assert_eq!(checksum.error.as_deref(), Some("card number is invalid"));
    }
}
