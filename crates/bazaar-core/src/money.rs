//! Fixed-point money helpers.
//!
//! All monetary values are [`Decimal`]s carried at two fractional digits.
//! Rounding is half-up (away from zero at the midpoint).
//!
//! Amounts entering the core are bounded by [`MAX_AMOUNT`] and all
//! arithmetic on them is checked, so a hostile price or quantity surfaces
//! as [`Error::AmountOutOfRange`] instead of a `Decimal` overflow panic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{Error, Result};

/// Fractional digits of the currency's minor unit.
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// Largest magnitude any single amount or total may have: 10^15.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Round half-up to the minor unit and pad the scale, so `25` becomes
/// `25.00` and `10.005` becomes `10.01`.
pub fn currency(value: Decimal) -> Decimal {
  let mut rounded = value
    .round_dp_with_strategy(MINOR_UNIT_DIGITS, RoundingStrategy::MidpointAwayFromZero);
  rounded.rescale(MINOR_UNIT_DIGITS);
  rounded
}

/// Reject amounts beyond [`MAX_AMOUNT`], then normalise with [`currency`].
pub fn checked(value: Decimal) -> Result<Decimal> {
  if value.abs() > MAX_AMOUNT {
    return Err(Error::AmountOutOfRange(value));
  }
  Ok(currency(value))
}

/// `quantity * unit_price`, exact.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Result<Decimal> {
  let total = unit_price
    .checked_mul(Decimal::from(quantity))
    .ok_or(Error::AmountOutOfRange(unit_price))?;
  checked(total)
}

/// Sum `values`, failing once the running total leaves the supported range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
  let total = values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
    acc.checked_add(v).ok_or(Error::AmountOutOfRange(v))
  })?;
  checked(total)
}
