//! The order ledger: derives an order's money state and status from its
//! payments, and gates every payment and workflow move.
//!
//! `total_paid = Σ completed charges − Σ reversals`. A charge refunded in
//! place simply stops counting as completed.

use rust_decimal::Decimal;

use crate::{
  Error, Result, money,
  order::{Order, OrderStatus, Payment, PaymentStatus},
};

/// The derived money state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
  pub total_paid:    Decimal,
  pub balance_due:   Decimal,
  pub is_fully_paid: bool,
  /// Whether any refund (in place or reversal) has been recorded.
  pub any_refund:    bool,
}

pub fn settle(total_price: Decimal, payments: &[Payment]) -> Settlement {
  let completed: Decimal = payments
    .iter()
    .filter(|p| !p.is_reversal() && p.status == PaymentStatus::Completed)
    .map(|p| p.amount)
    .sum();
  let reversed: Decimal = payments
    .iter()
    .filter(|p| p.is_reversal() && p.status == PaymentStatus::Refunded)
    .map(|p| p.amount)
    .sum();
  let any_refund = payments.iter().any(|p| p.status == PaymentStatus::Refunded);

  let total_paid = money::currency(completed - reversed);
  let balance_due = money::currency((total_price - total_paid).max(Decimal::ZERO));

  Settlement {
    total_paid,
    balance_due,
    is_fully_paid: total_paid >= total_price,
    any_refund,
  }
}

/// The status an order should have after a payment mutation.
///
/// Workflow-owned statuses (`shipped`, `completed`, `cancelled`) are returned
/// unchanged.
pub fn recompute(current: OrderStatus, total_price: Decimal, payments: &[Payment]) -> OrderStatus {
  if current.is_workflow_owned() {
    return current;
  }
  let s = settle(total_price, payments);
  if s.any_refund && s.total_paid <= Decimal::ZERO {
    OrderStatus::Refunded
  } else if s.is_fully_paid {
    OrderStatus::Paid
  } else if s.any_refund {
    OrderStatus::PartiallyRefunded
  } else {
    OrderStatus::Pending
  }
}

/// Validate a new charge of `amount` against `order` as it stands now.
pub fn check_new_payment(order: &Order, payments: &[Payment], amount: Decimal) -> Result<()> {
  if amount <= Decimal::ZERO {
    return Err(Error::InvalidAmount(amount));
  }
  if order.status.is_workflow_owned() {
    return Err(Error::OrderClosed { order_id: order.order_id, status: order.status });
  }
  let balance_due = settle(order.total_price, payments).balance_due;
  if amount > balance_due {
    return Err(Error::AmountExceedsBalance { amount, balance_due });
  }
  Ok(())
}

/// Gateway callbacks may only settle a pending charge.
pub fn check_status_update(payment: &Payment, to: PaymentStatus) -> Result<()> {
  let allowed = payment.status == PaymentStatus::Pending
    && !payment.is_reversal()
    && matches!(to, PaymentStatus::Completed | PaymentStatus::Failed);
  if allowed {
    Ok(())
  } else {
    Err(Error::InvalidPaymentTransition { from: payment.status, to })
  }
}

/// Only a completed charge that has not been reversed can be refunded.
pub fn check_refund(payment: &Payment, siblings: &[Payment]) -> Result<()> {
  let reversed = siblings
    .iter()
    .any(|p| p.refund_of == Some(payment.payment_id));
  if payment.is_reversal() || payment.status != PaymentStatus::Completed || reversed {
    return Err(Error::InvalidRefundState {
      payment_id: payment.payment_id,
      status:     payment.status,
    });
  }
  Ok(())
}

/// Gate a fulfilment-workflow move.
pub fn check_workflow(from: OrderStatus, to: OrderStatus) -> Result<()> {
  use OrderStatus::*;
  let allowed = match to {
    Cancelled => matches!(from, Pending | Paid | PartiallyRefunded),
    Shipped => from == Paid,
    Completed => from == Shipped,
    _ => false,
  };
  if allowed {
    Ok(())
  } else {
    Err(Error::InvalidOrderTransition { from, to })
  }
}

/// Completed charges that a cancellation must reverse.
pub fn charges_to_reverse(payments: &[Payment]) -> Vec<&Payment> {
  payments
    .iter()
    .filter(|p| !p.is_reversal() && p.status == PaymentStatus::Completed)
    .filter(|p| !payments.iter().any(|r| r.refund_of == Some(p.payment_id)))
    .collect()
}
