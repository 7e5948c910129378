//! Value Objects for the storefront cart

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Catalog identifier of a product (the API's `_id`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Result<Self, ProductIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ProductIdError::Empty); }
        if value.len() > 64 { return Err(ProductIdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for ProductId {
    type Error = ProductIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self { id.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductIdError {
    #[error("product id is empty")]
    Empty,
    #[error("product id is too long")]
    TooLong,
}

/// Non-negative amount in the storefront's single currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(MoneyError::Negative); }
        Ok(Self(amount))
    }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::Overflow)
    }

    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        self.0.checked_mul(Decimal::from(qty)).map(Money).ok_or(MoneyError::Overflow)
    }

    /// Integer amount in cents, rounding half away from zero (12.345 -> 1235).
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self { money.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount overflow")]
    Overflow,
}
