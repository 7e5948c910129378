//! Card data entered by the shopper.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::PaymentMethod;

/// What the card form reports once the shopper has typed their card.
/// Only display data is held here; the card number itself stays with the
/// payment provider's input widget.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PaymentDetails {
    #[serde(default)]
    pub method: PaymentMethod,
    /// Set by the card widget once every field is filled in.
    pub complete: bool,
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(length(equal = 4))]
    pub last4: String,
    #[validate(range(min = 1, max = 12))]
    pub exp_month: u32,
    #[validate(range(min = 2000))]
    pub exp_year: u32,
    #[validate(length(min = 3, max = 10))]
    pub postal_code: Option<String>,
}

impl PaymentDetails {
    /// Reason the form cannot be submitted yet, if any.
    pub fn incomplete_reason(&self) -> Option<String> {
        if !self.complete { return Some("card details are incomplete".to_string()); }
        self.validate().err().map(|errors| errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Card,
            complete: true,
            brand: "visa".into(),
            last4: "4242".into(),
            exp_month: 12,
            exp_year: 2030,
            postal_code: None,
        }
    }

    #[test]
    fn test_complete_card_is_accepted() {
        assert_eq!(filled().incomplete_reason(), None);
    }

    #[test]
    fn test_incomplete_card_is_rejected() {
        let details = PaymentDetails { complete: false, ..filled() };
        assert!(details.incomplete_reason().is_some());
        let details = PaymentDetails { last4: "42".into(), ..filled() };
        assert!(details.incomplete_reason().unwrap().contains("last4"));
        assert!(PaymentDetails::default().incomplete_reason().is_some());
    }
}
