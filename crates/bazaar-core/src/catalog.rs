//! Products, as far as the core needs them: an identity and a current price.
//!
//! Browsing, categories and stock belong to the catalog subsystem; the core
//! only snapshots the price at order time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, money};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub product_id: Uuid,
  pub name:       String,
  pub price:      Decimal,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CommerceStore::add_product`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name:  String,
  pub price: Decimal,
}

/// Normalise a catalog price, rejecting negative and oversized values.
pub fn checked_price(price: Decimal) -> Result<Decimal> {
  if price.is_sign_negative() && !price.is_zero() {
    return Err(Error::InvalidAmount(price));
  }
  money::checked(price)
}
