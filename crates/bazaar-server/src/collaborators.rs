//! Subscribers standing in for the notification, analytics and invoicing
//! subsystems. They observe committed events only; none of them can affect
//! the outcome of the operation that produced the event.

use std::sync::{
  Mutex,
  atomic::{AtomicU64, Ordering},
};

use bazaar_core::events::{BoxError, Event, Subscriber};
use rust_decimal::Decimal;

// ─── Notifications ────────────────────────────────────────────────────────────

/// Logs a customer notification for each event a customer would hear about.
#[derive(Debug, Default)]
pub struct NotificationLog;

impl Subscriber for NotificationLog {
  fn name(&self) -> &'static str { "notification_log" }

  fn handle(&self, event: &Event) -> Result<(), BoxError> {
    if matches!(event, Event::DiscountRedeemed { .. }) {
      return Ok(());
    }
    tracing::info!(
      owner_id = %event.owner_id(),
      kind = event.kind(),
      "notify customer"
    );
    Ok(())
  }
}

// ─── Analytics ────────────────────────────────────────────────────────────────

/// In-process aggregate counters fed by completion events.
#[derive(Debug, Default)]
pub struct AnalyticsCounters {
  completed_orders:   AtomicU64,
  completed_payments: AtomicU64,
  revenue:            Mutex<Decimal>,
}

impl AnalyticsCounters {
  pub fn completed_orders(&self) -> u64 { self.completed_orders.load(Ordering::Relaxed) }

  pub fn completed_payments(&self) -> u64 { self.completed_payments.load(Ordering::Relaxed) }

  /// Sum of the totals of completed orders.
  pub fn revenue(&self) -> Decimal {
    self.revenue.lock().map(|r| *r).unwrap_or_else(|poisoned| *poisoned.into_inner())
  }
}

impl Subscriber for AnalyticsCounters {
  fn name(&self) -> &'static str { "analytics" }

  fn handle(&self, event: &Event) -> Result<(), BoxError> {
    match event {
      Event::OrderCompleted { total_price, .. } => {
        let mut revenue = self.revenue.lock().map_err(|_| "revenue counter poisoned")?;
        *revenue = revenue.checked_add(*total_price).ok_or("revenue counter overflowed")?;
        self.completed_orders.fetch_add(1, Ordering::Relaxed);
      }
      Event::PaymentCompleted { .. } => {
        self.completed_payments.fetch_add(1, Ordering::Relaxed);
      }
      _ => {}
    }
    Ok(())
  }
}

// ─── Invoicing ────────────────────────────────────────────────────────────────

/// Requests an invoice when an order becomes fully paid.
#[derive(Debug, Default)]
pub struct InvoiceTrigger {
  requested: AtomicU64,
}

impl InvoiceTrigger {
  pub fn requested(&self) -> u64 { self.requested.load(Ordering::Relaxed) }
}

impl Subscriber for InvoiceTrigger {
  fn name(&self) -> &'static str { "invoice_trigger" }

  fn handle(&self, event: &Event) -> Result<(), BoxError> {
    if let Event::OrderPaid { owner_id, order_id, total_price } = event {
      self.requested.fetch_add(1, Ordering::Relaxed);
      tracing::info!(%owner_id, %order_id, %total_price, "invoice requested");
    }
    Ok(())
  }
}
