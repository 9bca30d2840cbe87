//! Post-commit domain events and their subscribers.
//!
//! [`crate::Commerce`] publishes an [`Event`] only after the store has
//! committed. Subscribers (notifications, invoicing, analytics) run in order;
//! a failing subscriber is logged and skipped and never affects the
//! committed state or the caller's result.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::order::OrderStatus;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
  OrderPlaced {
    owner_id:    Uuid,
    order_id:    Uuid,
    total_price: Decimal,
  },
  PaymentCompleted {
    owner_id:   Uuid,
    order_id:   Uuid,
    payment_id: Uuid,
    amount:     Decimal,
  },
  /// The order reached `paid`; the snapshot is final for invoicing.
  OrderPaid {
    owner_id:    Uuid,
    order_id:    Uuid,
    total_price: Decimal,
  },
  PaymentRefunded {
    owner_id:     Uuid,
    order_id:     Uuid,
    payment_id:   Uuid,
    amount:       Decimal,
    order_status: OrderStatus,
  },
  OrderCancelled {
    owner_id: Uuid,
    order_id: Uuid,
    /// Total of the reversal rows written by the cancellation.
    refunded: Decimal,
  },
  OrderShipped {
    owner_id: Uuid,
    order_id: Uuid,
  },
  OrderCompleted {
    owner_id:    Uuid,
    order_id:    Uuid,
    total_price: Decimal,
  },
  DiscountRedeemed {
    owner_id:       Uuid,
    discount_id:    Uuid,
    order_id:       Option<Uuid>,
    amount_applied: Decimal,
  },
}

impl Event {
  /// Stable event-kind string, e.g. `"order_placed"`.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::OrderPlaced { .. } => "order_placed",
      Self::PaymentCompleted { .. } => "payment_completed",
      Self::OrderPaid { .. } => "order_paid",
      Self::PaymentRefunded { .. } => "payment_refunded",
      Self::OrderCancelled { .. } => "order_cancelled",
      Self::OrderShipped { .. } => "order_shipped",
      Self::OrderCompleted { .. } => "order_completed",
      Self::DiscountRedeemed { .. } => "discount_redeemed",
    }
  }

  pub fn owner_id(&self) -> Uuid {
    match self {
      Self::OrderPlaced { owner_id, .. }
      | Self::PaymentCompleted { owner_id, .. }
      | Self::OrderPaid { owner_id, .. }
      | Self::PaymentRefunded { owner_id, .. }
      | Self::OrderCancelled { owner_id, .. }
      | Self::OrderShipped { owner_id, .. }
      | Self::OrderCompleted { owner_id, .. }
      | Self::DiscountRedeemed { owner_id, .. } => *owner_id,
    }
  }
}

/// A collaborator that observes committed state changes.
pub trait Subscriber: Send + Sync {
  /// Name used in logs.
  fn name(&self) -> &'static str;

  fn handle(&self, event: &Event) -> Result<(), BoxError>;
}

/// Ordered list of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
  subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBus {
  pub fn new() -> Self { Self::default() }

  pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
    self.subscribers.push(subscriber);
  }

  pub fn with(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
    self.subscribe(subscriber);
    self
  }

  pub fn len(&self) -> usize { self.subscribers.len() }

  pub fn is_empty(&self) -> bool { self.subscribers.is_empty() }

  /// Deliver `event` to every subscriber. Failures are logged, not returned.
  pub fn publish(&self, event: &Event) {
    for subscriber in &self.subscribers {
      if let Err(error) = subscriber.handle(event) {
        tracing::warn!(
          subscriber = subscriber.name(),
          kind = event.kind(),
          %error,
          "subscriber failed; event dropped for this subscriber"
        );
      }
    }
  }
}

impl std::fmt::Debug for EventBus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let names: Vec<_> = self.subscribers.iter().map(|s| s.name()).collect();
    f.debug_struct("EventBus").field("subscribers", &names).finish()
  }
}
