//! Discount codes, redemptions and the discount ledger rules.
//!
//! Validation and commit are split so a caller can preview a discount before
//! the order exists. Commit re-runs the capacity checks under the store's
//! write lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, money};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountType {
  /// `amount` is a percentage in `(0, 100]`.
  Percentage,
  /// `amount` is a currency value subtracted from the total.
  Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
  pub discount_id:     Uuid,
  /// Unique, compared case-insensitively.
  pub code:            String,
  pub description:     String,
  pub discount_type:   DiscountType,
  pub amount:          Decimal,
  pub min_order_value: Option<Decimal>,
  /// Global cap on redemptions; `None` is unlimited.
  pub usage_limit:     Option<u32>,
  /// Only ever incremented, and never past `usage_limit`.
  pub used_count:      u32,
  pub per_user_limit:  Option<u32>,
  pub is_active:       bool,
  pub valid_from:      DateTime<Utc>,
  pub valid_until:     Option<DateTime<Utc>>,
  pub created_at:      DateTime<Utc>,
}

impl Discount {
  /// Active and inside `[valid_from, valid_until)`.
  pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
    self.is_active && self.valid_from <= now && self.valid_until.is_none_or(|until| now < until)
  }
}

fn default_true() -> bool { true }

/// Input to [`crate::store::CommerceStore::create_discount`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewDiscount {
  pub code:            String,
  #[serde(default)]
  pub description:     String,
  pub discount_type:   DiscountType,
  pub amount:          Decimal,
  #[serde(default)]
  pub min_order_value: Option<Decimal>,
  #[serde(default)]
  pub usage_limit:     Option<u32>,
  #[serde(default)]
  pub per_user_limit:  Option<u32>,
  #[serde(default = "default_true")]
  pub is_active:       bool,
  /// Defaults to the creation time.
  #[serde(default)]
  pub valid_from:      Option<DateTime<Utc>>,
  #[serde(default)]
  pub valid_until:     Option<DateTime<Utc>>,
}

impl NewDiscount {
  pub fn new(code: impl Into<String>, discount_type: DiscountType, amount: Decimal) -> Self {
    Self {
      code: code.into(),
      description: String::new(),
      discount_type,
      amount,
      min_order_value: None,
      usage_limit: None,
      per_user_limit: None,
      is_active: true,
      valid_from: None,
      valid_until: None,
    }
  }

  /// Check and normalise the input into a [`Discount`] created at `now`.
  pub fn into_discount(self, now: DateTime<Utc>) -> Result<Discount> {
    let code = self.code.trim().to_owned();
    if code.is_empty() {
      return Err(Error::InvalidDiscount("code must not be empty".into()));
    }
    if self.amount <= Decimal::ZERO {
      return Err(Error::InvalidDiscount("amount must be greater than zero".into()));
    }
    if self.discount_type == DiscountType::Percentage && self.amount > Decimal::ONE_HUNDRED {
      return Err(Error::InvalidDiscount("percentage must not exceed 100".into()));
    }
    if self.amount > money::MAX_AMOUNT {
      return Err(Error::InvalidDiscount("amount is out of range".into()));
    }
    if self.usage_limit == Some(0) || self.per_user_limit == Some(0) {
      return Err(Error::InvalidDiscount("limits must be at least 1".into()));
    }
    if let Some(min) = self.min_order_value
      && min.is_sign_negative()
    {
      return Err(Error::InvalidDiscount("minimum order value must not be negative".into()));
    }
    let valid_from = self.valid_from.unwrap_or(now);
    if let Some(until) = self.valid_until
      && until <= valid_from
    {
      return Err(Error::InvalidDiscount("valid_until must be after valid_from".into()));
    }

    Ok(Discount {
      discount_id: Uuid::new_v4(),
      code,
      description: self.description,
      discount_type: self.discount_type,
      amount: self.amount,
      min_order_value: self.min_order_value.map(money::checked).transpose()?,
      usage_limit: self.usage_limit,
      used_count: 0,
      per_user_limit: self.per_user_limit,
      is_active: self.is_active,
      valid_from,
      valid_until: self.valid_until,
      created_at: now,
    })
  }
}

/// A discount together with how often one owner has already redeemed it.
#[derive(Debug, Clone)]
pub struct DiscountUsage {
  pub discount:          Discount,
  pub redeemed_by_owner: u32,
}

/// The priced result of a successful validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountQuote {
  pub discount:        Discount,
  pub order_total:     Decimal,
  /// Always `order_total − final_total`.
  pub discount_amount: Decimal,
  pub final_total:     Decimal,
}

/// Durable proof that an owner consumed a discount (optionally against an
/// order). `(discount_id, owner_id, order_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
  pub redemption_id:  Uuid,
  pub discount_id:    Uuid,
  pub owner_id:       Uuid,
  pub order_id:       Option<Uuid>,
  pub amount_applied: Decimal,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::CommerceStore::commit_redemption`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRedemption {
  pub discount_id:    Uuid,
  pub owner_id:       Uuid,
  #[serde(default)]
  pub order_id:       Option<Uuid>,
  pub amount_applied: Decimal,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Global and per-user caps (checks 4 and 5). Re-run at commit time.
pub fn check_capacity(discount: &Discount, redeemed_by_owner: u32) -> Result<()> {
  if let Some(limit) = discount.usage_limit
    && discount.used_count >= limit
  {
    return Err(Error::GlobalLimitReached(limit));
  }
  if let Some(limit) = discount.per_user_limit
    && redeemed_by_owner >= limit
  {
    return Err(Error::UserLimitReached(limit));
  }
  Ok(())
}

/// Checks 2 to 5 in order; the first failure wins. Check 1 (the code lookup)
/// is the store's job.
pub fn validate(usage: &DiscountUsage, order_total: Decimal, now: DateTime<Utc>) -> Result<()> {
  let discount = &usage.discount;
  if !discount.is_live_at(now) {
    return Err(Error::ExpiredOrInactive(discount.code.clone()));
  }
  if let Some(minimum) = discount.min_order_value
    && order_total < minimum
  {
    return Err(Error::BelowMinimum { order_total, minimum });
  }
  check_capacity(discount, usage.redeemed_by_owner)
}

/// Price a discount against `order_total`.
///
/// Percentage discounts take `amount`% of the total; fixed discounts never
/// exceed the total. The final total is rounded half-up to the minor unit.
pub fn quote(discount: &Discount, order_total: Decimal) -> Result<DiscountQuote> {
  let order_total = money::checked(order_total)?;
  let raw = match discount.discount_type {
    DiscountType::Percentage => order_total
      .checked_mul(discount.amount)
      .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
      .ok_or(Error::AmountOutOfRange(order_total))?,
    DiscountType::Fixed => discount.amount.min(order_total),
  };
  let final_total = money::currency((order_total - raw).max(Decimal::ZERO));
  Ok(DiscountQuote {
    discount: discount.clone(),
    discount_amount: money::currency(order_total - final_total),
    order_total,
    final_total,
  })
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn d(s: &str) -> Decimal { s.parse().unwrap() }

  fn save10() -> Discount {
    NewDiscount::new("SAVE10", DiscountType::Percentage, d("10"))
      .into_discount(Utc::now() - Duration::days(1))
      .unwrap()
  }

  fn usage(discount: Discount, redeemed_by_owner: u32) -> DiscountUsage {
    DiscountUsage { discount, redeemed_by_owner }
  }

  #[test]
  fn below_minimum() {
    let mut discount = save10();
    discount.min_order_value = Some(d("100.00"));
    let err = validate(&usage(discount, 0), d("50.00"), Utc::now()).unwrap_err();
    assert!(matches!(err, Error::BelowMinimum { .. }));
    assert_eq!(err.code(), "BELOW_MINIMUM");
  }

  #[test]
  fn inactive_and_expired() {
    let now = Utc::now();
    let mut inactive = save10();
    inactive.is_active = false;
    assert!(matches!(
      validate(&usage(inactive, 0), d("10"), now),
      Err(Error::ExpiredOrInactive(_))
    ));

    let mut expired = save10();
    expired.valid_until = Some(now - Duration::minutes(1));
    assert!(matches!(
      validate(&usage(expired, 0), d("10"), now),
      Err(Error::ExpiredOrInactive(_))
    ));

    let mut future = save10();
    future.valid_from = now + Duration::hours(1);
    assert!(validate(&usage(future, 0), d("10"), now).is_err());
  }

  #[test]
  fn first_failure_wins() {
    // Expired, below minimum and exhausted all at once: expiry is reported.
    let now = Utc::now();
    let mut discount = save10();
    discount.valid_until = Some(now - Duration::seconds(1));
    discount.min_order_value = Some(d("100"));
    discount.usage_limit = Some(1);
    discount.used_count = 1;
    assert!(matches!(
      validate(&usage(discount.clone(), 0), d("1"), now),
      Err(Error::ExpiredOrInactive(_))
    ));

    discount.valid_until = None;
    assert!(matches!(
      validate(&usage(discount, 0), d("1"), now),
      Err(Error::BelowMinimum { .. })
    ));
  }

  #[test]
  fn global_then_user_limit() {
    let mut discount = save10();
    discount.usage_limit = Some(2);
    discount.used_count = 2;
    discount.per_user_limit = Some(1);
    assert!(matches!(
      check_capacity(&discount, 1),
      Err(Error::GlobalLimitReached(2))
    ));

    discount.used_count = 1;
    assert!(matches!(check_capacity(&discount, 1), Err(Error::UserLimitReached(1))));
    assert!(check_capacity(&discount, 0).is_ok());
  }

  #[test]
  fn percentage_quote() {
    let q = quote(&save10(), d("50.00")).unwrap();
    assert_eq!(q.discount_amount, d("5.00"));
    assert_eq!(q.final_total, d("45.00"));
  }

  #[test]
  fn percentage_quote_rounds_half_up() {
    let mut discount = save10();
    discount.amount = d("12.5");
    // 12.5% of 0.99 = 0.12375 → final 0.86625 → 0.87
    let q = quote(&discount, d("0.99")).unwrap();
    assert_eq!(q.final_total, d("0.87"));
    assert_eq!(q.discount_amount, d("0.12"));
    assert_eq!(q.discount_amount + q.final_total, q.order_total);
  }

  #[test]
  fn fixed_quote_never_goes_negative() {
    let discount = NewDiscount::new("FLAT50", DiscountType::Fixed, d("50"))
      .into_discount(Utc::now())
      .unwrap();
    let q = quote(&discount, d("30.00")).unwrap();
    assert_eq!(q.final_total, d("0.00"));
    assert_eq!(q.discount_amount, d("30.00"));
  }

  #[test]
  fn oversized_totals_are_rejected_not_truncated() {
    assert!(matches!(
      quote(&save10(), d("900000000000000000000000000")),
      Err(Error::AmountOutOfRange(_))
    ));
    let q = quote(&save10(), money::MAX_AMOUNT).unwrap();
    assert_eq!(q.final_total.scale(), 2);
    assert_eq!(q.discount_amount + q.final_total, q.order_total);
  }

  #[test]
  fn creation_rules() {
    let now = Utc::now();
    let bad = |n: NewDiscount| matches!(n.into_discount(now), Err(Error::InvalidDiscount(_)));

    assert!(bad(NewDiscount::new("  ", DiscountType::Fixed, d("1"))));
    assert!(bad(NewDiscount::new("X", DiscountType::Fixed, d("0"))));
    assert!(bad(NewDiscount::new("X", DiscountType::Percentage, d("100.01"))));
    assert!(bad(NewDiscount::new("X", DiscountType::Fixed, d("5e28"))));

    let mut zero_limit = NewDiscount::new("X", DiscountType::Fixed, d("1"));
    zero_limit.usage_limit = Some(0);
    assert!(bad(zero_limit));

    let mut backwards = NewDiscount::new("X", DiscountType::Fixed, d("1"));
    backwards.valid_until = Some(now - Duration::days(1));
    assert!(bad(backwards));

    let ok = NewDiscount::new(" spring ", DiscountType::Percentage, d("100"))
      .into_discount(now)
      .unwrap();
    assert_eq!(ok.code, "spring");
    assert_eq!(ok.valid_from, now);
    assert_eq!(ok.used_count, 0);
  }
}
