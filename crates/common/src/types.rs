use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one mount of a view.
///
/// Every time the confirmation view is mounted it gets a fresh id, so a
/// late result from a previous mount can never be mistaken for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountId(Uuid);

impl MountId {
    /// Creates a new random mount ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MountId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Backend order identifier.
///
/// Opaque to the client: the backend may hand out UUIDs or short codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new order ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the order ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount (e.g. `129.99`) into cents.
    ///
    /// Sub-cent digits are rounded half away from zero. Returns `None` when
    /// the amount does not fit in an `i64` number of cents.
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let cents = amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)?
            .to_i64()?;
        Some(Self { cents })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or `None` if the product does not fit.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` if the sum does not fit.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Multiplies by a quantity, saturating at the representable bounds.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mount_id_new_creates_unique_ids() {
        let id1 = MountId::new();
        let id2 = MountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn mount_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        assert_eq!(MountId::from(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn order_id_is_transparent_in_json() {
        let id = OrderId::new("OC-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"OC-1\"");
        let parsed: OrderId = serde_json::from_str("\"OC-2\"").unwrap();
        assert_eq!(parsed.as_str(), "OC-2");
    }

    #[test]
    fn money_from_decimal_keeps_cents() {
        let money = Money::from_decimal(Decimal::from_str("129.99").unwrap()).unwrap();
        assert_eq!(money.cents(), 12999);
        assert_eq!(money.to_string(), "$129.99");
    }

    #[test]
    fn money_from_decimal_rounds_sub_cent_digits() {
        let up = Money::from_decimal(Decimal::from_str("10.005").unwrap()).unwrap();
        assert_eq!(up.cents(), 1001);

        let down = Money::from_decimal(Decimal::from_str("10.004").unwrap()).unwrap();
        assert_eq!(down.cents(), 1000);
    }

    #[test]
    fn money_checked_arithmetic_detects_overflow() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_multiply(2), None);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(250).checked_multiply(4),
            Some(Money::from_cents(1000))
        );
        assert_eq!(
            Money::from_cents(250).checked_add(Money::from_cents(50)),
            Some(Money::from_cents(300))
        );
    }

    #[test]
    fn money_operators_saturate_instead_of_panicking() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.multiply(2), max);
        assert_eq!(max + Money::from_cents(1), max);

        let total: Money = [max, max].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn money_sum_and_multiply() {
        let total: Money = [Money::from_cents(1000), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 1250);
        assert_eq!(Money::from_cents(333).multiply(3).cents(), 999);
    }
}
