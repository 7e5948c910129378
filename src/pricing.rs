//! Price computation helpers shared by the cart and the checkout sequencer.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::value_objects::{Money, MoneyError};

/// Sum of `price * quantity` over the cached line snapshots.
pub fn subtotal<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> Result<Money, MoneyError> {
    lines.into_iter().try_fold(Money::zero(), |acc, line| acc.add(&line.line_total()?))
}

pub fn total(subtotal: &Money, shipping: &Money) -> Result<Money, MoneyError> {
    subtotal.add(shipping)
}

/// Priced cart. `amount_minor` is what the payment authorizer is asked
/// to charge, in integer cents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub amount_minor: i64,
}

pub fn quote(cart: &Cart, shipping: &Money) -> Result<Quote, MoneyError> {
    let subtotal = subtotal(cart.lines())?;
    let total = total(&subtotal, shipping)?;
    Ok(Quote { subtotal, shipping: *shipping, total, amount_minor: total.to_minor_units()? })
}

/// Shipping charged on an order. The storefront only uses a flat rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingPolicy {
    FlatRate(Money),
}

impl ShippingPolicy {
    pub fn cost(&self) -> Money {
        match self { Self::FlatRate(rate) => *rate }
    }
}
