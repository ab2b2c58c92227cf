use serde::{Deserialize, Serialize};

/// Identity of a product, shared by the catalog and the stock ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    /// Creates a product ID from its numeric value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ProductId> for i64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

/// Money amount represented in cents to avoid floating point issues.
///
/// Serialized as a bare integer number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a Money amount from a decimal price, rounded to the nearest cent.
    ///
    /// Returns `None` for NaN or infinite input.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        Some(Self {
            cents: (amount * 100.0).round() as i64,
        })
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

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity. Returns `None` if the result overflows.
    pub fn multiply(&self, quantity: i64) -> Option<Money> {
        self.cents
            .checked_mul(quantity)
            .map(|cents| Money { cents })
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

/// Client-supplied token that makes a purchase request safe to retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Maximum accepted key length, in characters.
    pub const MAX_LEN: usize = 100;

    /// Interprets an optional raw key.
    ///
    /// Absent and blank (whitespace-only) keys mean "no idempotency".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some(key) if !key.trim().is_empty() => Some(Self(key.to_string())),
            _ => None,
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key fits the storage column.
    pub fn is_within_limit(&self) -> bool {
        self.0.chars().count() <= Self::MAX_LEN
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_display_and_conversion() {
        let id = ProductId::from(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn money_from_decimal_rounds_to_cents() {
        assert_eq!(Money::from_decimal(10.0), Some(Money::from_cents(1000)));
        assert_eq!(Money::from_decimal(19.999), Some(Money::from_cents(2000)));
        assert_eq!(Money::from_decimal(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_decimal(f64::INFINITY), None);
    }

    #[test]
    fn money_multiply_detects_overflow() {
        assert_eq!(
            Money::from_cents(250).multiply(3),
            Some(Money::from_cents(750))
        );
        assert_eq!(Money::from_cents(1999).multiply(10_000_000_000_000_000), None);
        assert_eq!(Money::from_cents(i64::MAX).multiply(2), None);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(1050).to_string(), "$10.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
    }

    #[test]
    fn money_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1234)).unwrap();
        assert_eq!(json, "1234");
    }

    #[test]
    fn blank_idempotency_keys_are_ignored() {
        assert_eq!(IdempotencyKey::parse(None), None);
        assert_eq!(IdempotencyKey::parse(Some("")), None);
        assert_eq!(IdempotencyKey::parse(Some("   \t")), None);
        assert_eq!(
            IdempotencyKey::parse(Some("A")).map(|k| k.as_str().to_string()),
            Some("A".to_string())
        );
    }

    #[test]
    fn idempotency_key_length_limit() {
        let ok = IdempotencyKey::parse(Some(&"k".repeat(100))).unwrap();
        assert!(ok.is_within_limit());
        let too_long = IdempotencyKey::parse(Some(&"k".repeat(101))).unwrap();
        assert!(!too_long.is_within_limit());
    }
}
