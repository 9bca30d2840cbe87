use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use bazaar_core::{
  Actor, Entity, Error as CoreError, ledger,
  order::{
    NewPayment, Order, OrderItem, OrderStatus, OrderTransition, OrderView, Payment, PaymentOutcome,
    PaymentStatus,
  },
};

use super::{query_all, query_one};
use crate::{
  Result,
  encode::{
    RawOrder, RawOrderItem, RawPayment, encode_dt, encode_enum, encode_money, encode_uuid,
  },
};

// ─── Loading ─────────────────────────────────────────────────────────────────

fn find(conn: &Connection, id: Uuid) -> Result<Option<Order>> {
  let sql = format!("SELECT {} FROM orders WHERE order_id = ?1", RawOrder::COLUMNS);
  query_one(conn, &sql, params![encode_uuid(id)], RawOrder::from_row)?
    .map(RawOrder::into_order)
    .transpose()
}

/// Load an order the actor may see, or report it missing.
pub fn load_scoped(conn: &Connection, actor: Actor, id: Uuid) -> Result<Order> {
  let order = find(conn, id)?.ok_or(CoreError::not_found(Entity::Order, id))?;
  actor.scope(order.owner_id, Entity::Order, id)?;
  Ok(order)
}

fn items(conn: &Connection, order_id: Uuid) -> Result<Vec<OrderItem>> {
  let sql = format!(
    "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY line_no",
    RawOrderItem::COLUMNS
  );
  query_all(conn, &sql, params![encode_uuid(order_id)], RawOrderItem::from_row)?
    .into_iter()
    .map(RawOrderItem::into_item)
    .collect()
}

fn payments(conn: &Connection, order_id: Uuid) -> Result<Vec<Payment>> {
  let sql = format!(
    "SELECT {} FROM payments WHERE order_id = ?1 ORDER BY created_at, rowid",
    RawPayment::COLUMNS
  );
  query_all(conn, &sql, params![encode_uuid(order_id)], RawPayment::from_row)?
    .into_iter()
    .map(RawPayment::into_payment)
    .collect()
}

fn find_payment(conn: &Connection, id: Uuid) -> Result<Option<Payment>> {
  let sql = format!("SELECT {} FROM payments WHERE payment_id = ?1", RawPayment::COLUMNS);
  query_one(conn, &sql, params![encode_uuid(id)], RawPayment::from_row)?
    .map(RawPayment::into_payment)
    .transpose()
}

fn view_of(conn: &Connection, order: Order) -> Result<OrderView> {
  let items = items(conn, order.order_id)?;
  let payments = payments(conn, order.order_id)?;
  Ok(OrderView::assemble(order, items, payments))
}

pub fn view(conn: &Connection, actor: Actor, id: Uuid) -> Result<OrderView> {
  let order = load_scoped(conn, actor, id)?;
  view_of(conn, order)
}

pub fn list(conn: &Connection, owner_id: Uuid) -> Result<Vec<Order>> {
  let sql = format!(
    "SELECT {} FROM orders WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
    RawOrder::COLUMNS
  );
  query_all(conn, &sql, params![encode_uuid(owner_id)], RawOrder::from_row)?
    .into_iter()
    .map(RawOrder::into_order)
    .collect()
}

/// Load a payment and the order it belongs to.
fn payment_with_order(conn: &Connection, id: Uuid) -> Result<(Payment, Order)> {
  let missing = || CoreError::not_found(Entity::Payment, id);
  let payment = find_payment(conn, id)?.ok_or_else(missing)?;
  let order = find(conn, payment.order_id)?.ok_or_else(missing)?;
  Ok((payment, order))
}

/// As [`payment_with_order`], scoped to the actor.
fn load_payment(conn: &Connection, actor: Actor, id: Uuid) -> Result<(Payment, Order)> {
  let (payment, order) = payment_with_order(conn, id)?;
  actor.scope(order.owner_id, Entity::Payment, id)?;
  Ok((payment, order))
}

pub fn payment(conn: &Connection, actor: Actor, id: Uuid) -> Result<Payment> {
  Ok(load_payment(conn, actor, id)?.0)
}

// ─── Writing ─────────────────────────────────────────────────────────────────

fn write_status(conn: &Connection, order_id: Uuid, status: OrderStatus) -> Result<()> {
  conn.execute(
    "UPDATE orders SET status = ?2 WHERE order_id = ?1",
    params![encode_uuid(order_id), encode_enum(status)],
  )?;
  Ok(())
}

fn insert_payment(conn: &Connection, payment: &Payment) -> Result<()> {
  conn.execute(
    "INSERT INTO payments (
       payment_id, order_id, amount, gateway, gateway_ref,
       status, refund_of, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(payment.payment_id),
      encode_uuid(payment.order_id),
      encode_money(payment.amount),
      encode_enum(payment.gateway),
      payment.gateway_ref,
      encode_enum(payment.status),
      payment.refund_of.map(encode_uuid),
      encode_dt(payment.created_at),
      encode_dt(payment.updated_at),
    ],
  )?;
  Ok(())
}

fn write_payment_status(conn: &Connection, payment: &Payment) -> Result<()> {
  conn.execute(
    "UPDATE payments SET status = ?2, updated_at = ?3 WHERE payment_id = ?1",
    params![
      encode_uuid(payment.payment_id),
      encode_enum(payment.status),
      encode_dt(payment.updated_at),
    ],
  )?;
  Ok(())
}

/// Re-derive the order's status from its payments and persist it.
fn settle(conn: &Connection, mut order: Order, payment: Payment) -> Result<PaymentOutcome> {
  let previous_status = order.status;
  let all = payments(conn, order.order_id)?;
  let status = ledger::recompute(order.status, order.total_price, &all);
  if status != previous_status {
    write_status(conn, order.order_id, status)?;
    order.status = status;
  }
  let items = items(conn, order.order_id)?;
  Ok(PaymentOutcome {
    payment,
    order: OrderView::assemble(order, items, all),
    previous_status,
  })
}

pub fn create_payment(conn: &Connection, actor: Actor, input: NewPayment) -> Result<PaymentOutcome> {
  let order = load_scoped(conn, actor, input.order_id)?;
  ledger::check_new_payment(&order, &payments(conn, order.order_id)?, input.amount)?;

  let now = Utc::now();
  let status = if input.gateway.completes_immediately() {
    PaymentStatus::Completed
  } else {
    PaymentStatus::Pending
  };
  let payment = Payment {
    payment_id: Uuid::new_v4(),
    order_id: order.order_id,
    amount: input.amount,
    gateway: input.gateway,
    gateway_ref: input.gateway_ref,
    status,
    refund_of: None,
    created_at: now,
    updated_at: now,
  };
  insert_payment(conn, &payment)?;
  settle(conn, order, payment)
}

pub fn set_payment_status(conn: &Connection, id: Uuid, to: PaymentStatus) -> Result<PaymentOutcome> {
  let (mut payment, order) = payment_with_order(conn, id)?;
  ledger::check_status_update(&payment, to)?;
  payment.status = to;
  payment.updated_at = Utc::now();
  write_payment_status(conn, &payment)?;
  settle(conn, order, payment)
}

pub fn refund_payment(conn: &Connection, actor: Actor, id: Uuid) -> Result<PaymentOutcome> {
  let (mut payment, order) = load_payment(conn, actor, id)?;
  ledger::check_refund(&payment, &payments(conn, order.order_id)?)?;
  payment.status = PaymentStatus::Refunded;
  payment.updated_at = Utc::now();
  write_payment_status(conn, &payment)?;
  settle(conn, order, payment)
}

/// Move an order along the fulfilment workflow. Cancelling writes one
/// reversal per completed, unreversed charge, referenced as
/// `refund:<charge id>`.
pub fn transition(conn: &Connection, actor: Actor, id: Uuid, to: OrderStatus) -> Result<OrderTransition> {
  let mut order = load_scoped(conn, actor, id)?;
  let previous_status = order.status;
  ledger::check_workflow(previous_status, to)?;

  let mut reversals = Vec::new();
  if to == OrderStatus::Cancelled {
    let now = Utc::now();
    let existing = payments(conn, id)?;
    for charge in ledger::charges_to_reverse(&existing) {
      let reversal = Payment {
        payment_id:  Uuid::new_v4(),
        order_id:    id,
        amount:      charge.amount,
        gateway:     charge.gateway,
        gateway_ref: Some(format!("refund:{}", charge.payment_id)),
        status:      PaymentStatus::Refunded,
        refund_of:   Some(charge.payment_id),
        created_at:  now,
        updated_at:  now,
      };
      insert_payment(conn, &reversal)?;
      reversals.push(reversal);
    }
  }

  write_status(conn, id, to)?;
  order.status = to;
  Ok(OrderTransition {
    order: view_of(conn, order)?,
    previous_status,
    reversals,
  })
}
