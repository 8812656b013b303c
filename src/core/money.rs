//! Monetary amounts.
//!
//! All balances and deltas are `rust_decimal::Decimal` values held at two fractional
//! digits. Amounts are normalized before they are written, and serialized as fixed
//! two-digit strings so no binary floating point ever touches the wire format.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for every amount.
pub const SCALE: u32 = 2;

/// Largest magnitude a `NUMERIC(10, 2)` column holds: `99999999.99`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Rounds an amount half away from zero to two digits and fixes its scale at two,
/// so `10000` becomes `10000.00`.
#[must_use]
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

/// Formats an amount with exactly two fractional digits.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    normalize(amount).to_string()
}

/// Rejects amounts too large for the store and returns the normalized value.
pub fn ensure_in_range(amount: Decimal) -> Result<Decimal> {
    let amount = normalize(amount);
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Rejects negative or oversized amounts and returns the normalized value.
pub fn ensure_non_negative(amount: Decimal) -> Result<Decimal> {
    let amount = ensure_in_range(amount)?;
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Rejects zero, negative and oversized amounts (after rounding) and returns the
/// normalized value.
pub fn ensure_positive(amount: Decimal) -> Result<Decimal> {
    let amount = ensure_in_range(amount)?;
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Serde adapter for amount fields: writes `"1500.00"`, reads strings or numbers.
pub mod serde_amount {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes an amount as a two-digit decimal string.
    pub fn serialize<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_amount(*amount))
    }

    /// Deserializes an amount and normalizes it to two digits.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        <Decimal as Deserialize>::deserialize(deserializer).map(super::normalize)
    }
}
