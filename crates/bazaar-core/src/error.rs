//! Error types for `bazaar-core`.
//!
//! Every variant is a recoverable, caller-reportable outcome. The stable code
//! returned by [`Error::code`] is what clients match on; the `Display` text is
//! the human-readable detail.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::order::{OrderStatus, PaymentStatus};

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Address,
  CartItem,
  Discount,
  Order,
  Payment,
  Product,
}

#[derive(Debug, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("actor may not act on behalf of owner {0}")]
  Forbidden(Uuid),

  // ── Cart → order ────────────────────────────────────────────────────────
  #[error("cart is empty")]
  EmptyCart,

  #[error("product {0} is no longer available")]
  ProductUnavailable(Uuid),

  #[error("quantity must be at least 1, got {0}")]
  InvalidQuantity(i64),

  // ── Payments ────────────────────────────────────────────────────────────
  #[error("amount must be greater than zero, got {0}")]
  InvalidAmount(Decimal),

  #[error("amount {0} is outside the supported range")]
  AmountOutOfRange(Decimal),

  #[error("amount {amount} exceeds the balance due of {balance_due}")]
  AmountExceedsBalance { amount: Decimal, balance_due: Decimal },

  #[error("payment {payment_id} cannot be refunded from status {status}")]
  InvalidRefundState { payment_id: Uuid, status: PaymentStatus },

  #[error("payment cannot move from {from} to {to}")]
  InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },

  #[error("order {order_id} is {status} and accepts no payments")]
  OrderClosed { order_id: Uuid, status: OrderStatus },

  #[error("order cannot move from {from} to {to}")]
  InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

  // ── Discounts ───────────────────────────────────────────────────────────
  #[error("invalid discount code {0:?}")]
  InvalidCode(String),

  #[error("discount {0:?} is inactive or outside its validity window")]
  ExpiredOrInactive(String),

  #[error("order total {order_total} is below the minimum of {minimum}")]
  BelowMinimum { order_total: Decimal, minimum: Decimal },

  #[error("discount has reached its global usage limit of {0}")]
  GlobalLimitReached(u32),

  #[error("discount has reached its per-user limit of {0}")]
  UserLimitReached(u32),

  #[error("discount {discount_id} was already redeemed for this order")]
  DuplicateRedemption { discount_id: Uuid },

  #[error("invalid discount: {0}")]
  InvalidDiscount(String),

  #[error("discount code {0:?} already exists")]
  DuplicateCode(String),

  // ── Addresses ───────────────────────────────────────────────────────────
  #[error("an identical address already exists for this owner")]
  DuplicateAddress,

  // ── Infrastructure ──────────────────────────────────────────────────────
  #[error("the operation hit lock contention; try again")]
  ContentionRetry,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// The stable, SCREAMING_SNAKE_CASE code for this error kind.
  pub fn code(&self) -> &'static str { self.into() }

  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// `true` when retrying the whole operation may succeed.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::ContentionRetry) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
