//! [`SqliteStore`], the SQLite implementation of [`CommerceStore`].

use std::{path::Path, time::Duration};

use rusqlite::{Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use uuid::Uuid;

use bazaar_core::{
  Actor,
  address::{Address, AddressPatch, AddressRemoval, NewAddress},
  cart::{CartItem, CartView},
  catalog::{NewProduct, Product},
  discount::{Discount, DiscountUsage, NewRedemption, Redemption},
  order::{NewPayment, Order, OrderStatus, OrderTransition, OrderView, Payment, PaymentOutcome, PaymentStatus},
  store::CommerceStore,
};

use crate::{Error, Result, ops, schema::SCHEMA};

/// How long a writer waits for the database lock before giving up with
/// [`Error::Contention`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A commerce store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Clones share
/// one connection thread, so their operations are serialised; separate
/// [`SqliteStore::open`] calls on the same file contend through SQLite's own
/// locking instead.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for SqliteStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SqliteStore").finish_non_exhaustive()
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// As [`SqliteStore::open`], waiting at most `busy_timeout` for the write
  /// lock.
  pub async fn open_with(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, busy_timeout).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, DEFAULT_BUSY_TIMEOUT).await
  }

  async fn init(conn: tokio_rusqlite::Connection, busy_timeout: Duration) -> Result<Self> {
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!(?busy_timeout, "sqlite store ready");
    Ok(Self { conn })
  }

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
  ///
  /// The write lock is taken before the first read, so everything `f` reads
  /// stays valid until commit. The transaction commits only if `f` returns
  /// `Ok`; on `Err` it is dropped and rolls back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Run `f` inside a read transaction, so multi-query reads see one
  /// snapshot.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(f(&tx))
      })
      .await?
  }
}

// ─── CommerceStore impl ──────────────────────────────────────────────────────

impl CommerceStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_product(&self, input: NewProduct) -> Result<Product> {
    self.write(move |tx| ops::catalog::insert(tx, input)).await
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    self.read(move |tx| ops::catalog::find(tx, id)).await
  }

  async fn set_product_price(&self, id: Uuid, price: Decimal) -> Result<Product> {
    self.write(move |tx| ops::catalog::set_price(tx, id, price)).await
  }

  async fn retire_product(&self, id: Uuid) -> Result<()> {
    self.write(move |tx| ops::catalog::retire(tx, id)).await
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn create_address(&self, actor: Actor, owner_id: Uuid, input: NewAddress) -> Result<Address> {
    actor.act_for(owner_id)?;
    self.write(move |tx| ops::address::create(tx, owner_id, input)).await
  }

  async fn update_address(&self, actor: Actor, id: Uuid, patch: AddressPatch) -> Result<Address> {
    self.write(move |tx| ops::address::update(tx, actor, id, patch)).await
  }

  async fn set_default_address(&self, actor: Actor, id: Uuid) -> Result<Address> {
    self.write(move |tx| ops::address::set_default(tx, actor, id)).await
  }

  async fn delete_address(&self, actor: Actor, id: Uuid) -> Result<AddressRemoval> {
    self.write(move |tx| ops::address::delete(tx, actor, id)).await
  }

  async fn get_address(&self, actor: Actor, id: Uuid) -> Result<Address> {
    self.read(move |tx| ops::address::load_scoped(tx, actor, id)).await
  }

  async fn list_addresses(&self, actor: Actor, owner_id: Uuid) -> Result<Vec<Address>> {
    actor.act_for(owner_id)?;
    self.read(move |tx| ops::address::list(tx, owner_id)).await
  }

  // ── Cart ──────────────────────────────────────────────────────────────────

  async fn add_to_cart(&self, actor: Actor, product_id: Uuid, quantity: u32) -> Result<CartItem> {
    self.write(move |tx| ops::cart::add(tx, actor.user_id, product_id, quantity)).await
  }

  async fn set_cart_quantity(&self, actor: Actor, product_id: Uuid, quantity: u32) -> Result<CartItem> {
    self
      .write(move |tx| ops::cart::set_quantity(tx, actor.user_id, product_id, quantity))
      .await
  }

  async fn remove_from_cart(&self, actor: Actor, product_id: Uuid) -> Result<()> {
    self.write(move |tx| ops::cart::remove(tx, actor.user_id, product_id)).await
  }

  async fn get_cart(&self, actor: Actor, owner_id: Uuid) -> Result<CartView> {
    actor.act_for(owner_id)?;
    self.read(move |tx| ops::cart::view(tx, owner_id)).await
  }

  async fn place_order(&self, actor: Actor) -> Result<OrderView> {
    self.write(move |tx| ops::cart::place_order(tx, actor.user_id)).await
  }

  // ── Orders & payments ─────────────────────────────────────────────────────

  async fn get_order(&self, actor: Actor, id: Uuid) -> Result<OrderView> {
    self.read(move |tx| ops::order::view(tx, actor, id)).await
  }

  async fn list_orders(&self, actor: Actor, owner_id: Uuid) -> Result<Vec<Order>> {
    actor.act_for(owner_id)?;
    self.read(move |tx| ops::order::list(tx, owner_id)).await
  }

  async fn transition_order(&self, actor: Actor, id: Uuid, to: OrderStatus) -> Result<OrderTransition> {
    self.write(move |tx| ops::order::transition(tx, actor, id, to)).await
  }

  async fn create_payment(&self, actor: Actor, input: NewPayment) -> Result<PaymentOutcome> {
    self.write(move |tx| ops::order::create_payment(tx, actor, input)).await
  }

  async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<PaymentOutcome> {
    self.write(move |tx| ops::order::set_payment_status(tx, id, status)).await
  }

  async fn refund_payment(&self, actor: Actor, id: Uuid) -> Result<PaymentOutcome> {
    self.write(move |tx| ops::order::refund_payment(tx, actor, id)).await
  }

  async fn get_payment(&self, actor: Actor, id: Uuid) -> Result<Payment> {
    self.read(move |tx| ops::order::payment(tx, actor, id)).await
  }

  // ── Discounts ─────────────────────────────────────────────────────────────

  async fn create_discount(&self, discount: Discount) -> Result<Discount> {
    self.write(move |tx| ops::discount::insert(tx, discount)).await
  }

  async fn get_discount(&self, id: Uuid) -> Result<Option<Discount>> {
    self.read(move |tx| ops::discount::find(tx, id)).await
  }

  async fn discount_usage(&self, code: &str, owner_id: Uuid) -> Result<Option<DiscountUsage>> {
    let code = code.to_owned();
    self.read(move |tx| ops::discount::usage(tx, &code, owner_id)).await
  }

  async fn commit_redemption(&self, actor: Actor, input: NewRedemption) -> Result<Redemption> {
    self.write(move |tx| ops::discount::commit(tx, actor, input)).await
  }
}
