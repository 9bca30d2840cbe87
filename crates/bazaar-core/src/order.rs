//! Orders, order items and payments.
//!
//! An order's money state (`total_paid`, `balance_due`, `is_fully_paid`) is
//! never stored; [`OrderView`] derives it from the payment rows on every read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, ledger, money};

// ─── Order ───────────────────────────────────────────────────────────────────

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
pub enum OrderStatus {
  Pending,
  Paid,
  Shipped,
  Completed,
  Cancelled,
  PartiallyRefunded,
  Refunded,
}

impl OrderStatus {
  /// Statuses owned by the fulfilment workflow. The ledger never overwrites
  /// them.
  pub fn is_workflow_owned(self) -> bool {
    matches!(self, Self::Shipped | Self::Completed | Self::Cancelled)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub order_id:    Uuid,
  pub owner_id:    Uuid,
  pub status:      OrderStatus,
  /// Fixed at placement time.
  pub total_price: Decimal,
  pub created_at:  DateTime<Utc>,
}

/// Immutable snapshot of one cart line at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
  pub order_id:     Uuid,
  pub product_id:   Uuid,
  pub product_name: String,
  pub quantity:     u32,
  /// The product's price when the order was placed.
  pub unit_price:   Decimal,
}

impl OrderItem {
  pub fn line_total(&self) -> Result<Decimal> {
    money::line_total(self.unit_price, self.quantity)
  }
}

// ─── Payment ─────────────────────────────────────────────────────────────────

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
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

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
pub enum Gateway {
  Esewa,
  Khalti,
  Stripe,
  /// Cash on delivery.
  Cod,
}

impl Gateway {
  /// Gateways whose payments are settled at submission time.
  pub fn completes_immediately(self) -> bool { matches!(self, Self::Cod) }
}

/// A money movement against an order.
///
/// A *charge* (`refund_of = None`) is money taken from the customer. A
/// *reversal* (`refund_of = Some(charge)`) is a separate refund row written
/// when an order is cancelled; it always has status `refunded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
  pub payment_id:  Uuid,
  pub order_id:    Uuid,
  pub amount:      Decimal,
  pub gateway:     Gateway,
  pub gateway_ref: Option<String>,
  pub status:      PaymentStatus,
  pub refund_of:   Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Payment {
  pub fn is_reversal(&self) -> bool { self.refund_of.is_some() }
}

/// Input to [`crate::store::CommerceStore::create_payment`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
  pub order_id:    Uuid,
  pub amount:      Decimal,
  pub gateway:     Gateway,
  #[serde(default)]
  pub gateway_ref: Option<String>,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// An order with its items, payments and derived money state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
  pub order:         Order,
  pub items:         Vec<OrderItem>,
  pub payments:      Vec<Payment>,
  pub total_paid:    Decimal,
  pub balance_due:   Decimal,
  pub is_fully_paid: bool,
}

impl OrderView {
  pub fn assemble(order: Order, items: Vec<OrderItem>, payments: Vec<Payment>) -> Self {
    let settlement = ledger::settle(order.total_price, &payments);
    Self {
      order,
      items,
      payments,
      total_paid: settlement.total_paid,
      balance_due: settlement.balance_due,
      is_fully_paid: settlement.is_fully_paid,
    }
  }
}

/// Result of any payment mutation: the payment, the recomputed order, and
/// the order status before the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
  pub payment:         Payment,
  pub order:           OrderView,
  pub previous_status: OrderStatus,
}

impl PaymentOutcome {
  pub fn status_changed(&self) -> bool { self.previous_status != self.order.order.status }
}

/// Result of a fulfilment-workflow move (cancel, ship, complete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTransition {
  pub order:           OrderView,
  pub previous_status: OrderStatus,
  /// Reversal rows written by a cancellation.
  pub reversals:       Vec<Payment>,
}
