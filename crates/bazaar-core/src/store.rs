//! The `CommerceStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bazaar-store-sqlite`).
//! Higher layers (`bazaar-api`, `bazaar-server`) depend on this abstraction
//! through [`crate::Commerce`], not on any concrete backend.
//!
//! Every mutating method is one unit of work: the backend performs the read
//! that decides the mutation and the mutation itself inside a single
//! transaction that serialises against competing writers. On error nothing
//! is committed.
//!
//! Ownership checks that need stored data (does this address belong to the
//! actor?) happen here, inside the transaction. Staff-only gates that need no
//! data are applied by the orchestrator before the call.

use std::future::Future;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Actor,
  address::{Address, AddressPatch, AddressRemoval, NewAddress},
  cart::{CartItem, CartView},
  catalog::{NewProduct, Product},
  discount::{Discount, DiscountUsage, NewRedemption, Redemption},
  order::{NewPayment, Order, OrderStatus, OrderTransition, OrderView, Payment, PaymentOutcome, PaymentStatus},
};

/// Abstraction over a transactional relational store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CommerceStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn add_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Returns `None` if the product does not exist (or was retired).
  fn get_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  fn set_product_price(
    &self,
    id: Uuid,
    price: Decimal,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Remove a product. Carts still referencing it can no longer be placed.
  fn retire_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Addresses ─────────────────────────────────────────────────────────

  /// Create an address for `owner_id`. When `input.is_default` is set, the
  /// owner's other defaults are cleared in the same transaction.
  fn create_address(
    &self,
    actor: Actor,
    owner_id: Uuid,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  fn update_address(
    &self,
    actor: Actor,
    id: Uuid,
    patch: AddressPatch,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  /// Make `id` the owner's only default. A no-op if it already is.
  fn set_default_address(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  /// Delete an address, promoting the newest remaining one if the deleted
  /// address was the default.
  fn delete_address(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<AddressRemoval, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  /// The owner's addresses, default first, then newest first.
  fn list_addresses(
    &self,
    actor: Actor,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Address>, Self::Error>> + Send + '_;

  // ── Cart ──────────────────────────────────────────────────────────────

  /// Add `quantity` of a product to the actor's cart, merging into an
  /// existing line. The cart is created on first use.
  fn add_to_cart(
    &self,
    actor: Actor,
    product_id: Uuid,
    quantity: u32,
  ) -> impl Future<Output = Result<CartItem, Self::Error>> + Send + '_;

  fn set_cart_quantity(
    &self,
    actor: Actor,
    product_id: Uuid,
    quantity: u32,
  ) -> impl Future<Output = Result<CartItem, Self::Error>> + Send + '_;

  fn remove_from_cart(
    &self,
    actor: Actor,
    product_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_cart(
    &self,
    actor: Actor,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<CartView, Self::Error>> + Send + '_;

  /// Convert the actor's cart into a `pending` order and empty the cart.
  fn place_order(
    &self,
    actor: Actor,
  ) -> impl Future<Output = Result<OrderView, Self::Error>> + Send + '_;

  // ── Orders & payments ─────────────────────────────────────────────────

  fn get_order(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<OrderView, Self::Error>> + Send + '_;

  /// The owner's orders, newest first.
  fn list_orders(
    &self,
    actor: Actor,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send + '_;

  /// Move an order to `cancelled`, `shipped` or `completed`. Cancelling
  /// writes one reversal per completed, unreversed charge.
  fn transition_order(
    &self,
    actor: Actor,
    id: Uuid,
    to: OrderStatus,
  ) -> impl Future<Output = Result<OrderTransition, Self::Error>> + Send + '_;

  /// Record a charge and recompute the order in the same transaction.
  fn create_payment(
    &self,
    actor: Actor,
    input: NewPayment,
  ) -> impl Future<Output = Result<PaymentOutcome, Self::Error>> + Send + '_;

  /// Settle a pending charge (gateway callback) and recompute the order.
  fn set_payment_status(
    &self,
    id: Uuid,
    status: PaymentStatus,
  ) -> impl Future<Output = Result<PaymentOutcome, Self::Error>> + Send + '_;

  /// Refund a completed charge in place and recompute the order.
  fn refund_payment(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<PaymentOutcome, Self::Error>> + Send + '_;

  fn get_payment(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  // ── Discounts ─────────────────────────────────────────────────────────

  /// Persist a validated discount. Fails if the code exists under any case.
  fn create_discount(
    &self,
    discount: Discount,
  ) -> impl Future<Output = Result<Discount, Self::Error>> + Send + '_;

  fn get_discount(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Discount>, Self::Error>> + Send + '_;

  /// Look a code up case-insensitively, together with how many times
  /// `owner_id` has redeemed it. `None` if no such code exists.
  fn discount_usage<'a>(
    &'a self,
    code: &'a str,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<DiscountUsage>, Self::Error>> + Send + 'a;

  /// Record a redemption and increment `used_count` exactly once, re-checking
  /// the global and per-user caps while holding the write lock.
  fn commit_redemption(
    &self,
    actor: Actor,
    input: NewRedemption,
  ) -> impl Future<Output = Result<Redemption, Self::Error>> + Send + '_;
}
