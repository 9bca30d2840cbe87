//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are hyphenated lowercase strings. Timestamps are fixed-width
//! RFC 3339 UTC strings with microsecond precision, so lexical order is
//! chronological order. Money is a decimal string and enums use their
//! snake_case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rust_decimal::Decimal;
use uuid::Uuid;

use bazaar_core::{
  address::Address,
  cart::CartItem,
  catalog::Product,
  discount::Discount,
  money,
  order::{Order, OrderItem, Payment},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_money(d: Decimal) -> String { money::currency(d).to_string() }

pub fn decode_money(s: &str) -> Result<Decimal> { Ok(money::currency(Decimal::from_str(s)?)) }

/// Enums are stored by their `strum` snake_case name.
pub fn encode_enum<T: Into<&'static str>>(value: T) -> &'static str { value.into() }

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn decode_count(column: &'static str, n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode { column, value: n.to_string() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `products` row.
pub struct RawProduct {
  pub product_id: String,
  pub name:       String,
  pub price:      String,
  pub created_at: String,
}

impl RawProduct {
  pub const COLUMNS: &'static str = "product_id, name, price, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_id: row.get(0)?,
      name:       row.get(1)?,
      price:      row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      product_id: decode_uuid(&self.product_id)?,
      name:       self.name,
      price:      decode_money(&self.price)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAddress {
  pub address_id:     String,
  pub owner_id:       String,
  pub address_type:   String,
  pub recipient_name: String,
  pub street:         String,
  pub city:           String,
  pub postal_code:    String,
  pub country:        String,
  pub is_default:     bool,
  pub created_at:     String,
}

impl RawAddress {
  pub const COLUMNS: &'static str = "address_id, owner_id, address_type, recipient_name, street, \
                                     city, postal_code, country, is_default, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      address_id:     row.get(0)?,
      owner_id:       row.get(1)?,
      address_type:   row.get(2)?,
      recipient_name: row.get(3)?,
      street:         row.get(4)?,
      city:           row.get(5)?,
      postal_code:    row.get(6)?,
      country:        row.get(7)?,
      is_default:     row.get(8)?,
      created_at:     row.get(9)?,
    })
  }

  pub fn into_address(self) -> Result<Address> {
    Ok(Address {
      address_id:     decode_uuid(&self.address_id)?,
      owner_id:       decode_uuid(&self.owner_id)?,
      address_type:   decode_enum("address_type", &self.address_type)?,
      recipient_name: self.recipient_name,
      street:         self.street,
      city:           self.city,
      postal_code:    self.postal_code,
      country:        self.country,
      is_default:     self.is_default,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCartItem {
  pub cart_id:    String,
  pub product_id: String,
  pub quantity:   i64,
}

impl RawCartItem {
  pub fn into_item(self) -> Result<CartItem> {
    Ok(CartItem {
      cart_id:    decode_uuid(&self.cart_id)?,
      product_id: decode_uuid(&self.product_id)?,
      quantity:   decode_count("quantity", self.quantity)?,
    })
  }
}

pub struct RawOrder {
  pub order_id:    String,
  pub owner_id:    String,
  pub status:      String,
  pub total_price: String,
  pub created_at:  String,
}

impl RawOrder {
  pub const COLUMNS: &'static str = "order_id, owner_id, status, total_price, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:    row.get(0)?,
      owner_id:    row.get(1)?,
      status:      row.get(2)?,
      total_price: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_order(self) -> Result<Order> {
    Ok(Order {
      order_id:    decode_uuid(&self.order_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      status:      decode_enum("status", &self.status)?,
      total_price: decode_money(&self.total_price)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawOrderItem {
  pub order_id:     String,
  pub product_id:   String,
  pub product_name: String,
  pub quantity:     i64,
  pub unit_price:   String,
}

impl RawOrderItem {
  pub const COLUMNS: &'static str = "order_id, product_id, product_name, quantity, unit_price";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:     row.get(0)?,
      product_id:   row.get(1)?,
      product_name: row.get(2)?,
      quantity:     row.get(3)?,
      unit_price:   row.get(4)?,
    })
  }

  pub fn into_item(self) -> Result<OrderItem> {
    Ok(OrderItem {
      order_id:     decode_uuid(&self.order_id)?,
      product_id:   decode_uuid(&self.product_id)?,
      product_name: self.product_name,
      quantity:     decode_count("quantity", self.quantity)?,
      unit_price:   decode_money(&self.unit_price)?,
    })
  }
}

pub struct RawPayment {
  pub payment_id:  String,
  pub order_id:    String,
  pub amount:      String,
  pub gateway:     String,
  pub gateway_ref: Option<String>,
  pub status:      String,
  pub refund_of:   Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPayment {
  pub const COLUMNS: &'static str = "payment_id, order_id, amount, gateway, gateway_ref, status, \
                                     refund_of, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:  row.get(0)?,
      order_id:    row.get(1)?,
      amount:      row.get(2)?,
      gateway:     row.get(3)?,
      gateway_ref: row.get(4)?,
      status:      row.get(5)?,
      refund_of:   row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    Ok(Payment {
      payment_id:  decode_uuid(&self.payment_id)?,
      order_id:    decode_uuid(&self.order_id)?,
      amount:      decode_money(&self.amount)?,
      gateway:     decode_enum("gateway", &self.gateway)?,
      gateway_ref: self.gateway_ref,
      status:      decode_enum("status", &self.status)?,
      refund_of:   self.refund_of.as_deref().map(decode_uuid).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawDiscount {
  pub discount_id:     String,
  pub code:            String,
  pub description:     String,
  pub discount_type:   String,
  pub amount:          String,
  pub min_order_value: Option<String>,
  pub usage_limit:     Option<i64>,
  pub used_count:      i64,
  pub per_user_limit:  Option<i64>,
  pub is_active:       bool,
  pub valid_from:      String,
  pub valid_until:     Option<String>,
  pub created_at:      String,
}

impl RawDiscount {
  pub const COLUMNS: &'static str = "discount_id, code, description, discount_type, amount, \
                                     min_order_value, usage_limit, used_count, per_user_limit, \
                                     is_active, valid_from, valid_until, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      discount_id:     row.get(0)?,
      code:            row.get(1)?,
      description:     row.get(2)?,
      discount_type:   row.get(3)?,
      amount:          row.get(4)?,
      min_order_value: row.get(5)?,
      usage_limit:     row.get(6)?,
      used_count:      row.get(7)?,
      per_user_limit:  row.get(8)?,
      is_active:       row.get(9)?,
      valid_from:      row.get(10)?,
      valid_until:     row.get(11)?,
      created_at:      row.get(12)?,
    })
  }

  pub fn into_discount(self) -> Result<Discount> {
    Ok(Discount {
      discount_id:     decode_uuid(&self.discount_id)?,
      code:            self.code,
      description:     self.description,
      discount_type:   decode_enum("discount_type", &self.discount_type)?,
      // Percentages may carry more than two digits; keep them as stored.
      amount:          Decimal::from_str(&self.amount)?,
      min_order_value: self.min_order_value.as_deref().map(decode_money).transpose()?,
      usage_limit:     self
        .usage_limit
        .map(|n| decode_count("usage_limit", n))
        .transpose()?,
      used_count:      decode_count("used_count", self.used_count)?,
      per_user_limit:  self
        .per_user_limit
        .map(|n| decode_count("per_user_limit", n))
        .transpose()?,
      is_active:       self.is_active,
      valid_from:      decode_dt(&self.valid_from)?,
      valid_until:     self.valid_until.as_deref().map(decode_dt).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use bazaar_core::order::OrderStatus;
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea, "2024-01-02T03:04:05.000000Z");
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn money_keeps_two_places() {
    assert_eq!(encode_money(Decimal::from(25)), "25.00");
    assert_eq!(decode_money("10.5").unwrap().to_string(), "10.50");
    assert!(decode_money("ten").is_err());
  }

  #[test]
  fn enums_use_snake_case_names() {
    assert_eq!(encode_enum(OrderStatus::PartiallyRefunded), "partially_refunded");
    let status: OrderStatus = decode_enum("status", "partially_refunded").unwrap();
    assert_eq!(status, OrderStatus::PartiallyRefunded);
    assert!(matches!(
      decode_enum::<OrderStatus>("status", "lost"),
      Err(Error::Decode { column: "status", .. })
    ));
  }
}
