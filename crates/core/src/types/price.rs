//! Non-negative monetary amounts using decimal arithmetic.
//!
//! Prices are kept as [`Decimal`] rounded to cents so that line totals are
//! exact. On the wire they are plain JSON numbers (`12.99`), matching what
//! API clients send.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Price cannot be negative")]
    Negative,
    #[error("Price cannot exceed 9999999999.99")]
    TooLarge,
}

/// A catalog or snapshot price in the shop currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Number of decimal places kept.
    pub const SCALE: u32 = 2;

    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable price, matching the `NUMERIC(12, 2)` column.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, Self::SCALE));

    /// Create a price, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero and
    /// `PriceError::TooLarge` for amounts above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let amount = amount.round_dp(Self::SCALE);
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Create a price from an integer number of cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative input and
    /// `PriceError::TooLarge` above [`Price::MAX`].
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    ///
    /// Bounded by `Price::MAX * i32::MAX` (about 2.1e19), far inside the
    /// range of [`Decimal`]. Saturates rather than panicking regardless.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Decimal {
        self.0
            .checked_mul(Decimal::from(quantity))
            .unwrap_or(Decimal::MAX)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::from_cents(-1), Err(PriceError::Negative));
        assert_eq!(PriceError::Negative.to_string(), "Price cannot be negative");
        assert!(Price::from_cents(0).is_ok());
    }

    #[test]
    fn test_rejects_above_column_range() {
        assert_eq!(Price::MAX.amount(), Decimal::new(999_999_999_999, 2));
        assert_eq!(Price::from_cents(999_999_999_999), Ok(Price::MAX));
        assert_eq!(
            Price::from_cents(1_000_000_000_000),
            Err(PriceError::TooLarge)
        );
        assert_eq!(
            Price::new(Decimal::from_scientific("1e28").unwrap()),
            Err(PriceError::TooLarge)
        );
        assert!(serde_json::from_str::<Price>("1e28").is_err());
    }

    #[test]
    fn test_times_at_bounds() {
        let expected = Decimal::new(999_999_999_999, 2) * Decimal::from(i32::MAX);
        assert_eq!(Price::MAX.times(i32::MAX), expected);
    }

    #[test]
    fn test_rounds_to_cents() {
        let price = Price::new(Decimal::new(12_999, 3)).unwrap();
        assert_eq!(price.amount(), Decimal::new(1300, 2));
    }

    #[test]
    fn test_times_is_exact() {
        let price = Price::from_cents(1299).unwrap();
        assert_eq!(price.times(3), Decimal::new(3897, 2));
    }

    #[test]
    fn test_json_number() {
        let price = Price::from_cents(599).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "5.99");

        let parsed: Price = serde_json::from_str("5.99").unwrap();
        assert_eq!(parsed, price);

        assert!(serde_json::from_str::<Price>("-2").is_err());
    }
}
