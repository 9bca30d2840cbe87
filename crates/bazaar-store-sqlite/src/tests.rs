//! Integration tests for `SqliteStore`, driven through `Commerce`.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use bazaar_core::{
  Actor, Commerce, Error as CoreError,
  address::{AddressPatch, AddressType, NewAddress},
  catalog::{NewProduct, Product},
  discount::{DiscountType, NewDiscount, NewRedemption},
  events::{BoxError, Event, EventBus, Subscriber},
  order::{Gateway, NewPayment, OrderStatus, OrderView, PaymentStatus},
  store::CommerceStore,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::SqliteStore;

fn d(s: &str) -> Decimal { s.parse().unwrap() }

fn staff() -> Actor { Actor::staff(Uuid::new_v4()) }

fn customer() -> Actor { Actor::customer(Uuid::new_v4()) }

async fn commerce() -> Commerce<SqliteStore> {
  Commerce::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

async fn product(c: &Commerce<SqliteStore>, name: &str, price: &str) -> Product {
  c.add_product(staff(), NewProduct { name: name.into(), price: d(price) })
    .await
    .unwrap()
}

fn address(street: &str, is_default: bool) -> NewAddress {
  NewAddress {
    address_type: AddressType::Home,
    recipient_name: "Sita Sharma".into(),
    street: street.into(),
    city: "Kathmandu".into(),
    postal_code: "44600".into(),
    country: "NP".into(),
    is_default,
  }
}

/// Place an order for `actor` containing one line per `(price, quantity)`.
async fn order(c: &Commerce<SqliteStore>, actor: Actor, lines: &[(&str, i64)]) -> OrderView {
  for (i, (price, quantity)) in lines.iter().enumerate() {
    let p = product(c, &format!("item {i}"), price).await;
    c.add_to_cart(actor, p.product_id, *quantity).await.unwrap();
  }
  c.place_order(actor).await.unwrap()
}

fn cod(order_id: Uuid, amount: &str) -> NewPayment {
  NewPayment { order_id, amount: d(amount), gateway: Gateway::Cod, gateway_ref: None }
}

async fn default_count(c: &Commerce<SqliteStore>, actor: Actor) -> usize {
  c.list_addresses(actor, actor.user_id)
    .await
    .unwrap()
    .iter()
    .filter(|a| a.is_default)
    .count()
}

// ─── Addresses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_default_moves_the_flag() {
  let c = commerce().await;
  let me = customer();
  let a = c.create_address(me, me.user_id, address("1 Main St", true)).await.unwrap();
  let b = c.create_address(me, me.user_id, address("2 Side St", false)).await.unwrap();

  c.set_default_address(me, b.address_id).await.unwrap();

  assert!(!c.get_address(me, a.address_id).await.unwrap().is_default);
  assert!(c.get_address(me, b.address_id).await.unwrap().is_default);
  assert_eq!(default_count(&c, me).await, 1);
  let default = c.default_address(me, me.user_id).await.unwrap();
  assert_eq!(default.map(|a| a.address_id), Some(b.address_id));
}

#[tokio::test]
async fn deleting_the_default_promotes_the_newest() {
  let c = commerce().await;
  let me = customer();
  let a = c.create_address(me, me.user_id, address("1 Main St", true)).await.unwrap();
  let _older = c.create_address(me, me.user_id, address("2 Side St", false)).await.unwrap();
  let newest = c.create_address(me, me.user_id, address("3 Hill Rd", false)).await.unwrap();

  let removal = c.delete_address(me, a.address_id).await.unwrap();
  assert_eq!(removal.removed.address_id, a.address_id);
  assert_eq!(removal.promoted.map(|p| p.address_id), Some(newest.address_id));
  assert!(c.get_address(me, newest.address_id).await.unwrap().is_default);
  assert_eq!(default_count(&c, me).await, 1);
}

#[tokio::test]
async fn deleting_a_non_default_promotes_nothing() {
  let c = commerce().await;
  let me = customer();
  c.create_address(me, me.user_id, address("1 Main St", true)).await.unwrap();
  let b = c.create_address(me, me.user_id, address("2 Side St", false)).await.unwrap();

  let removal = c.delete_address(me, b.address_id).await.unwrap();
  assert!(removal.promoted.is_none());
  assert_eq!(default_count(&c, me).await, 1);
}

#[tokio::test]
async fn at_most_one_default_through_any_sequence() {
  let c = commerce().await;
  let me = customer();
  let mut ids = Vec::new();
  for (i, street) in ["a", "b", "c", "d"].iter().enumerate() {
    let created = c
      .create_address(me, me.user_id, address(street, i % 2 == 0))
      .await
      .unwrap();
    ids.push(created.address_id);
    assert!(default_count(&c, me).await <= 1);
  }

  let patch = AddressPatch { is_default: Some(true), city: Some("Lalitpur".into()), ..Default::default() };
  c.update_address(me, ids[3], patch).await.unwrap();
  assert_eq!(default_count(&c, me).await, 1);

  let unset = AddressPatch { is_default: Some(false), ..Default::default() };
  c.update_address(me, ids[3], unset).await.unwrap();
  assert_eq!(default_count(&c, me).await, 0);

  c.set_default_address(me, ids[1]).await.unwrap();
  c.set_default_address(me, ids[1]).await.unwrap();
  c.delete_address(me, ids[0]).await.unwrap();
  assert_eq!(default_count(&c, me).await, 1);
}

#[tokio::test]
async fn list_puts_the_default_first() {
  let c = commerce().await;
  let me = customer();
  let first = c.create_address(me, me.user_id, address("1", true)).await.unwrap();
  c.create_address(me, me.user_id, address("2", false)).await.unwrap();
  let third = c.create_address(me, me.user_id, address("3", false)).await.unwrap();

  let listed = c.list_addresses(me, me.user_id).await.unwrap();
  assert_eq!(listed[0].address_id, first.address_id);
  assert_eq!(listed[1].address_id, third.address_id);
}

#[tokio::test]
async fn identical_addresses_are_rejected() {
  let c = commerce().await;
  let me = customer();
  c.create_address(me, me.user_id, address("1 Main St", false)).await.unwrap();
  let err = c
    .create_address(me, me.user_id, address("1 Main St", true))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "DUPLICATE_ADDRESS");
  // The failed create must not have cleared anything.
  assert_eq!(c.list_addresses(me, me.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn foreign_addresses_look_missing() {
  let c = commerce().await;
  let owner = customer();
  let a = c.create_address(owner, owner.user_id, address("1", true)).await.unwrap();

  let stranger = customer();
  let err = c.set_default_address(stranger, a.address_id).await.unwrap_err();
  assert_eq!(err.code(), "NOT_FOUND");
  let err = c.list_addresses(stranger, owner.user_id).await.unwrap_err();
  assert_eq!(err.code(), "FORBIDDEN");

  assert!(c.get_address(staff(), a.address_id).await.is_ok());
}

// ─── Cart → order ────────────────────────────────────────────────────────────

#[tokio::test]
async fn place_order_snapshots_prices_and_empties_the_cart() {
  let c = commerce().await;
  let me = customer();
  let tea = product(&c, "Tea", "25.00").await;
  let mug = product(&c, "Mug", "10.00").await;
  c.add_to_cart(me, tea.product_id, 1).await.unwrap();
  c.add_to_cart(me, tea.product_id, 1).await.unwrap();
  c.add_to_cart(me, mug.product_id, 3).await.unwrap();

  let view = c.place_order(me).await.unwrap();
  assert_eq!(view.order.total_price, d("80.00"));
  assert_eq!(view.order.status, OrderStatus::Pending);
  assert_eq!(view.items.len(), 2);
  assert_eq!(view.items[0].quantity, 2);
  assert_eq!(view.items[0].unit_price, d("25.00"));
  let sum: Decimal = view.items.iter().map(|i| i.line_total().unwrap()).sum();
  assert_eq!(sum, view.order.total_price);
  assert!(c.get_cart(me, me.user_id).await.unwrap().is_empty());

  // Later price changes do not touch the snapshot.
  c.set_product_price(staff(), tea.product_id, d("30.00")).await.unwrap();
  let reread = c.get_order(me, view.order.order_id).await.unwrap();
  assert_eq!(reread.items[0].unit_price, d("25.00"));
  assert_eq!(reread.order.total_price, d("80.00"));
}

#[tokio::test]
async fn placing_twice_fails_with_empty_cart() {
  let c = commerce().await;
  let me = customer();
  order(&c, me, &[("5.00", 1)]).await;
  let err = c.place_order(me).await.unwrap_err();
  assert!(matches!(err, CoreError::EmptyCart));
  assert_eq!(c.list_orders(me, me.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn retired_product_blocks_placement_and_keeps_the_cart() {
  let c = commerce().await;
  let me = customer();
  let kept = product(&c, "Kept", "3.00").await;
  let gone = product(&c, "Gone", "4.00").await;
  c.add_to_cart(me, kept.product_id, 1).await.unwrap();
  c.add_to_cart(me, gone.product_id, 2).await.unwrap();
  c.retire_product(staff(), gone.product_id).await.unwrap();

  let cart = c.get_cart(me, me.user_id).await.unwrap();
  assert_eq!(cart.subtotal, d("3.00"));
  assert_eq!(cart.lines.iter().filter(|l| !l.is_available()).count(), 1);

  let err = c.place_order(me).await.unwrap_err();
  assert!(matches!(err, CoreError::ProductUnavailable(id) if id == gone.product_id));
  assert_eq!(c.get_cart(me, me.user_id).await.unwrap().lines.len(), 2);
  assert!(c.list_orders(me, me.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn cart_line_edits() {
  let c = commerce().await;
  let me = customer();
  let p = product(&c, "Tea", "2.00").await;

  assert_eq!(c.add_to_cart(me, p.product_id, 0).await.unwrap_err().code(), "INVALID_QUANTITY");
  assert_eq!(c.add_to_cart(me, Uuid::new_v4(), 1).await.unwrap_err().code(), "NOT_FOUND");

  c.add_to_cart(me, p.product_id, 2).await.unwrap();
  let item = c.set_cart_quantity(me, p.product_id, 5).await.unwrap();
  assert_eq!(item.quantity, 5);
  assert_eq!(c.get_cart(me, me.user_id).await.unwrap().subtotal, d("10.00"));

  c.remove_from_cart(me, p.product_id).await.unwrap();
  let err = c.remove_from_cart(me, p.product_id).await.unwrap_err();
  assert_eq!(err.code(), "NOT_FOUND");
}

// ─── Order ledger ────────────────────────────────────────────────────────────

#[tokio::test]
async fn partial_payments_then_refund() {
  let c = commerce().await;
  let me = customer();
  let view = order(&c, me, &[("100.00", 1)]).await;
  let id = view.order.order_id;

  let first = c.create_payment(me, cod(id, "60")).await.unwrap();
  assert_eq!(first.order.order.status, OrderStatus::Pending);
  assert_eq!(first.order.balance_due, d("40.00"));

  let second = c.create_payment(me, cod(id, "40")).await.unwrap();
  assert_eq!(second.order.order.status, OrderStatus::Paid);
  assert_eq!(second.order.balance_due, d("0.00"));
  assert!(second.order.is_fully_paid);

  let refund = c.refund_payment(me, first.payment.payment_id).await.unwrap();
  assert_eq!(refund.payment.status, PaymentStatus::Refunded);
  assert_eq!(refund.order.order.status, OrderStatus::PartiallyRefunded);
  assert_eq!(refund.order.total_paid, d("40.00"));
  assert!(!refund.order.is_fully_paid);

  let reread = c.get_order(me, id).await.unwrap();
  assert_eq!(reread.order.status, OrderStatus::PartiallyRefunded);
  assert_eq!(reread.payments.len(), 2);
}

#[tokio::test]
async fn overpayment_is_rejected() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("10.00", 1)]).await.order.order_id;

  let err = c.create_payment(me, cod(id, "10.01")).await.unwrap_err();
  assert_eq!(err.code(), "AMOUNT_EXCEEDS_BALANCE");
  let err = c.create_payment(me, cod(id, "0")).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_AMOUNT");
  assert!(c.get_order(me, id).await.unwrap().payments.is_empty());
}

#[tokio::test]
async fn gateway_payments_settle_through_status_updates() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("20.00", 1)]).await.order.order_id;
  let pending = NewPayment {
    order_id:    id,
    amount:      d("20.00"),
    gateway:     Gateway::Khalti,
    gateway_ref: Some("kh_123".into()),
  };

  let outcome = c.create_payment(me, pending).await.unwrap();
  assert_eq!(outcome.payment.status, PaymentStatus::Pending);
  assert_eq!(outcome.order.total_paid, d("0.00"));
  let payment_id = outcome.payment.payment_id;

  let err = c
    .set_payment_status(me, payment_id, PaymentStatus::Completed)
    .await
    .unwrap_err();
  assert_eq!(err.code(), "FORBIDDEN");

  let settled = c
    .set_payment_status(staff(), payment_id, PaymentStatus::Completed)
    .await
    .unwrap();
  assert_eq!(settled.order.order.status, OrderStatus::Paid);

  let err = c
    .set_payment_status(staff(), payment_id, PaymentStatus::Failed)
    .await
    .unwrap_err();
  assert_eq!(err.code(), "INVALID_PAYMENT_TRANSITION");
}

#[tokio::test]
async fn refunding_twice_is_rejected() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("8.00", 1)]).await.order.order_id;
  let paid = c.create_payment(me, cod(id, "8")).await.unwrap();

  let refunded = c.refund_payment(me, paid.payment.payment_id).await.unwrap();
  assert_eq!(refunded.order.order.status, OrderStatus::Refunded);
  let err = c.refund_payment(me, paid.payment.payment_id).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_REFUND_STATE");
}

#[tokio::test]
async fn oversized_amounts_fail_without_breaking_the_store() {
  let c = commerce().await;
  let err = c
    .add_product(staff(), NewProduct { name: "Yacht".into(), price: d("5e28") })
    .await
    .unwrap_err();
  assert_eq!(err.code(), "AMOUNT_OUT_OF_RANGE");

  let me = customer();
  let pricey = product(&c, "Island", "1000000000000000.00").await;
  c.add_to_cart(me, pricey.product_id, 2).await.unwrap();
  let err = c.place_order(me).await.unwrap_err();
  assert_eq!(err.code(), "AMOUNT_OUT_OF_RANGE");
  let err = c.get_cart(me, me.user_id).await.unwrap_err();
  assert_eq!(err.code(), "AMOUNT_OUT_OF_RANGE");

  // The connection is still usable afterwards.
  c.remove_from_cart(me, pricey.product_id).await.unwrap();
  let id = order(&c, me, &[("12.50", 2)]).await.order.order_id;
  assert_eq!(c.get_order(me, id).await.unwrap().order.total_price, d("25.00"));
}

#[tokio::test]
async fn cancelling_reverses_completed_charges() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("50.00", 1)]).await.order.order_id;
  let charge = NewPayment { gateway_ref: Some("COD-7781".into()), ..cod(id, "30") };
  let charge = c.create_payment(me, charge).await.unwrap();

  let cancelled = c.cancel_order(me, id).await.unwrap();
  assert_eq!(cancelled.previous_status, OrderStatus::Pending);
  assert_eq!(cancelled.order.order.status, OrderStatus::Cancelled);
  assert_eq!(cancelled.reversals.len(), 1);
  assert_eq!(cancelled.reversals[0].refund_of, Some(charge.payment.payment_id));
  assert_eq!(
    cancelled.reversals[0].gateway_ref,
    Some(format!("refund:{}", charge.payment.payment_id))
  );
  assert_eq!(cancelled.order.total_paid, d("0.00"));

  let err = c.create_payment(me, cod(id, "1")).await.unwrap_err();
  assert_eq!(err.code(), "ORDER_CLOSED");
  let err = c.cancel_order(me, id).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_ORDER_TRANSITION");
}

#[tokio::test]
async fn late_gateway_completion_leaves_the_order_cancelled() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("12.00", 1)]).await.order.order_id;
  let pending = NewPayment { order_id: id, amount: d("12"), gateway: Gateway::Esewa, gateway_ref: None };
  let payment_id = c.create_payment(me, pending).await.unwrap().payment.payment_id;
  c.cancel_order(me, id).await.unwrap();

  let late = c
    .set_payment_status(staff(), payment_id, PaymentStatus::Completed)
    .await
    .unwrap();
  assert_eq!(late.order.order.status, OrderStatus::Cancelled);
  assert_eq!(late.order.total_paid, d("12.00"));
}

#[tokio::test]
async fn fulfilment_workflow() {
  let c = commerce().await;
  let me = customer();
  let id = order(&c, me, &[("9.99", 2)]).await.order.order_id;

  assert_eq!(c.ship_order(staff(), id).await.unwrap_err().code(), "INVALID_ORDER_TRANSITION");
  c.create_payment(me, cod(id, "19.98")).await.unwrap();
  assert_eq!(c.ship_order(me, id).await.unwrap_err().code(), "FORBIDDEN");

  let shipped = c.ship_order(staff(), id).await.unwrap();
  assert_eq!(shipped.order.order.status, OrderStatus::Shipped);
  assert_eq!(c.cancel_order(me, id).await.unwrap_err().code(), "INVALID_ORDER_TRANSITION");

  let done = c.complete_order(staff(), id).await.unwrap();
  assert_eq!(done.order.order.status, OrderStatus::Completed);
  assert!(done.order.is_fully_paid);
}

#[tokio::test]
async fn foreign_orders_look_missing() {
  let c = commerce().await;
  let owner = customer();
  let id = order(&c, owner, &[("1.00", 1)]).await.order.order_id;
  let stranger = customer();

  assert_eq!(c.get_order(stranger, id).await.unwrap_err().code(), "NOT_FOUND");
  assert_eq!(
    c.create_payment(stranger, cod(id, "1")).await.unwrap_err().code(),
    "NOT_FOUND"
  );
  assert_eq!(c.cancel_order(stranger, id).await.unwrap_err().code(), "NOT_FOUND");
}

// ─── Discount ledger ─────────────────────────────────────────────────────────

fn save10(limit: Option<u32>) -> NewDiscount {
  let mut input = NewDiscount::new("SAVE10", DiscountType::Percentage, d("10"));
  input.usage_limit = limit;
  input
}

fn redemption(discount_id: Uuid, owner: Actor, order_id: Option<Uuid>) -> NewRedemption {
  NewRedemption { discount_id, owner_id: owner.user_id, order_id, amount_applied: d("5.00") }
}

#[tokio::test]
async fn validate_quotes_and_enforces_minimum() {
  let c = commerce().await;
  let mut input = save10(None);
  input.min_order_value = Some(d("100.00"));
  c.create_discount(staff(), input).await.unwrap();
  let me = customer();

  let err = c.validate_discount(me, "SAVE10", d("50.00")).await.unwrap_err();
  assert_eq!(err.code(), "BELOW_MINIMUM");

  let quote = c.validate_discount(me, "save10", d("150.00")).await.unwrap();
  assert_eq!(quote.discount_amount, d("15.00"));
  assert_eq!(quote.final_total, d("135.00"));

  let err = c.validate_discount(me, "NOPE", d("150.00")).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_CODE");
}

#[tokio::test]
async fn validate_rejects_totals_beyond_currency_range() {
  let c = commerce().await;
  c.create_discount(staff(), save10(None)).await.unwrap();
  let me = customer();

  let err = c.validate_discount(me, "SAVE10", d("9e26")).await.unwrap_err();
  assert_eq!(err.code(), "AMOUNT_OUT_OF_RANGE");

  let quote = c.validate_discount(me, "SAVE10", d("1000000000000000")).await.unwrap();
  assert_eq!(quote.final_total.scale(), 2);
  assert_eq!(quote.discount_amount + quote.final_total, d("1000000000000000.00"));
}

#[tokio::test]
async fn codes_are_unique_ignoring_case() {
  let c = commerce().await;
  c.create_discount(staff(), save10(None)).await.unwrap();
  let err = c
    .create_discount(staff(), NewDiscount::new("save10", DiscountType::Fixed, d("1")))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "DUPLICATE_CODE");
  let err = c.create_discount(customer(), save10(None)).await.unwrap_err();
  assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
async fn redeeming_the_same_order_twice_counts_once() {
  let c = commerce().await;
  let discount = c.create_discount(staff(), save10(Some(5))).await.unwrap();
  let me = customer();
  let order_id = order(&c, me, &[("50.00", 1)]).await.order.order_id;

  c.commit_redemption(me, redemption(discount.discount_id, me, Some(order_id)))
    .await
    .unwrap();
  let err = c
    .commit_redemption(me, redemption(discount.discount_id, me, Some(order_id)))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "DUPLICATE_REDEMPTION");

  let after = c.get_discount(discount.discount_id).await.unwrap();
  assert_eq!(after.used_count, 1);
}

#[tokio::test]
async fn per_user_limit_is_enforced_at_commit() {
  let c = commerce().await;
  let mut input = save10(None);
  input.per_user_limit = Some(1);
  let discount = c.create_discount(staff(), input).await.unwrap();
  let me = customer();

  c.commit_redemption(me, redemption(discount.discount_id, me, None)).await.unwrap();
  let err = c
    .commit_redemption(me, redemption(discount.discount_id, me, None))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "USER_LIMIT_REACHED");
  let err = c.validate_discount(me, "SAVE10", d("10")).await.unwrap_err();
  assert_eq!(err.code(), "USER_LIMIT_REACHED");

  let other = customer();
  assert!(c.commit_redemption(other, redemption(discount.discount_id, other, None)).await.is_ok());
}

#[tokio::test]
async fn redeeming_for_someone_else_is_forbidden() {
  let c = commerce().await;
  let discount = c.create_discount(staff(), save10(None)).await.unwrap();
  let me = customer();
  let err = c
    .commit_redemption(me, redemption(discount.discount_id, customer(), None))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "FORBIDDEN");
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

/// Open `n` independent stores (separate connections) on one database file.
async fn shared_file(n: usize) -> (tempfile::TempDir, Vec<Commerce<SqliteStore>>) {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("bazaar.db");
  let mut stores = Vec::with_capacity(n);
  for _ in 0..n {
    stores.push(Commerce::new(SqliteStore::open(&path).await.unwrap()));
  }
  (dir, stores)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_respect_a_single_use_code() {
  let (_dir, stores) = shared_file(2).await;
  let discount = stores[0].create_discount(staff(), save10(Some(1))).await.unwrap();

  let (a, b) = (customer(), customer());
  let (ra, rb) = tokio::join!(
    stores[0].commit_redemption(a, redemption(discount.discount_id, a, None)),
    stores[1].commit_redemption(b, redemption(discount.discount_id, b, None)),
  );

  let results = [ra, rb];
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
  assert_eq!(failure.code(), "GLOBAL_LIMIT_REACHED");
  assert_eq!(stores[1].get_discount(discount.discount_id).await.unwrap().used_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn usage_limit_holds_under_load() {
  let (_dir, stores) = shared_file(3).await;
  let stores: Vec<_> = stores.into_iter().map(Arc::new).collect();
  let discount = stores[0].create_discount(staff(), save10(Some(3))).await.unwrap();

  let mut handles = Vec::new();
  for i in 0..12 {
    let store = stores[i % stores.len()].clone();
    let id = discount.discount_id;
    handles.push(tokio::spawn(async move {
      let who = customer();
      store.commit_redemption(who, redemption(id, who, None)).await
    }));
  }

  let mut ok = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => ok += 1,
      Err(e) => assert_eq!(e.code(), "GLOBAL_LIMIT_REACHED"),
    }
  }
  assert_eq!(ok, 3);
  assert_eq!(stores[2].get_discount(discount.discount_id).await.unwrap().used_count, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_default_switches_leave_one_default() {
  let (_dir, stores) = shared_file(2).await;
  let me = customer();
  let a = stores[0].create_address(me, me.user_id, address("1 Main St", false)).await.unwrap();
  let b = stores[0].create_address(me, me.user_id, address("2 Side St", false)).await.unwrap();

  for _ in 0..5 {
    let (ra, rb) = tokio::join!(
      stores[0].set_default_address(me, a.address_id),
      stores[1].set_default_address(me, b.address_id),
    );
    let results = [ra, rb];
    assert!(results.iter().any(|r| r.is_ok()));
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
      assert_eq!(err.code(), "CONTENTION_RETRY");
    }
    assert_eq!(default_count(&stores[1], me).await, 1);
    assert_eq!(default_count(&stores[0], me).await, 1);
  }
}

#[tokio::test]
async fn a_held_write_lock_surfaces_as_contention() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("bazaar.db");
  let store = SqliteStore::open_with(&path, Duration::from_millis(50)).await.unwrap();

  let blocker = rusqlite::Connection::open(&path).unwrap();
  blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

  let err = store
    .add_product(NewProduct { name: "Tea".into(), price: d("1") })
    .await
    .unwrap_err();
  let core: CoreError = err.into();
  assert!(core.is_retryable());
  assert_eq!(core.code(), "CONTENTION_RETRY");

  blocker.execute_batch("ROLLBACK").unwrap();
  assert!(store
    .add_product(NewProduct { name: "Tea".into(), price: d("1") })
    .await
    .is_ok());
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder(Mutex<Vec<Event>>);

impl Subscriber for Recorder {
  fn name(&self) -> &'static str { "recorder" }

  fn handle(&self, event: &Event) -> Result<(), BoxError> {
    self.0.lock().unwrap().push(event.clone());
    Ok(())
  }
}

struct Failing;

impl Subscriber for Failing {
  fn name(&self) -> &'static str { "failing" }

  fn handle(&self, _: &Event) -> Result<(), BoxError> { Err("mail server unreachable".into()) }
}

#[tokio::test]
async fn subscriber_failures_never_undo_the_operation() {
  let recorder = Arc::new(Recorder::default());
  let bus = EventBus::new().with(Arc::new(Failing)).with(recorder.clone());
  let c = Commerce::with_events(SqliteStore::open_in_memory().await.unwrap(), bus);
  let me = customer();

  let view = order(&c, me, &[("40.00", 1)]).await;
  let id = view.order.order_id;
  c.create_payment(me, cod(id, "40")).await.unwrap();

  assert_eq!(c.get_order(me, id).await.unwrap().order.status, OrderStatus::Paid);
  let kinds: Vec<_> = recorder.0.lock().unwrap().iter().map(Event::kind).collect();
  assert_eq!(kinds, vec!["order_placed", "payment_completed", "order_paid"]);
}

#[tokio::test]
async fn failed_operations_publish_nothing() {
  let recorder = Arc::new(Recorder::default());
  let c = Commerce::with_events(
    SqliteStore::open_in_memory().await.unwrap(),
    EventBus::new().with(recorder.clone()),
  );
  assert!(c.place_order(customer()).await.is_err());
  assert!(recorder.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancellation_event_carries_the_reversed_total() {
  let recorder = Arc::new(Recorder::default());
  let c = Commerce::with_events(
    SqliteStore::open_in_memory().await.unwrap(),
    EventBus::new().with(recorder.clone()),
  );
  let me = customer();
  let id = order(&c, me, &[("30.00", 1)]).await.order.order_id;
  c.create_payment(me, cod(id, "10")).await.unwrap();
  c.create_payment(me, cod(id, "5.50")).await.unwrap();
  c.cancel_order(me, id).await.unwrap();

  let events = recorder.0.lock().unwrap();
  let last = events.last().unwrap();
  assert_eq!(
    *last,
    Event::OrderCancelled { owner_id: me.user_id, order_id: id, refunded: d("15.50") }
  );
}
