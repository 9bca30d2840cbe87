//! [`Commerce`], the orchestrator every caller goes through.
//!
//! It applies the data-free gates (staff checks, input normalisation), hands
//! the unit of work to the store, and publishes events once the store has
//! committed.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Actor, Error, Result,
  address::{Address, AddressPatch, AddressRemoval, NewAddress},
  cart::{self, CartItem, CartView},
  catalog::{self, NewProduct, Product},
  discount::{self, Discount, DiscountQuote, NewDiscount, NewRedemption, Redemption},
  error::Entity,
  events::{Event, EventBus},
  money,
  order::{NewPayment, Order, OrderStatus, OrderTransition, OrderView, Payment, PaymentOutcome, PaymentStatus},
  store::CommerceStore,
};

fn lift<T, E: Into<Error>>(result: std::result::Result<T, E>) -> Result<T> {
  result.map_err(|e| {
    let e = e.into();
    if e.is_retryable() {
      warn!("lock wait timed out; operation rolled back");
    }
    e
  })
}

/// The commerce core bound to a store and a set of post-commit subscribers.
#[derive(Debug)]
pub struct Commerce<S> {
  store:  S,
  events: EventBus,
}

impl<S: CommerceStore> Commerce<S> {
  pub fn new(store: S) -> Self { Self::with_events(store, EventBus::new()) }

  pub fn with_events(store: S, events: EventBus) -> Self { Self { store, events } }

  pub fn store(&self) -> &S { &self.store }

  pub fn events(&self) -> &EventBus { &self.events }

  fn publish(&self, event: Event) {
    debug!(kind = event.kind(), owner_id = %event.owner_id(), "publishing event");
    self.events.publish(&event);
  }

  // ── Catalog ───────────────────────────────────────────────────────────

  pub async fn add_product(&self, actor: Actor, input: NewProduct) -> Result<Product> {
    actor.require_staff()?;
    let input = NewProduct { price: catalog::checked_price(input.price)?, ..input };
    let product = lift(self.store.add_product(input).await)?;
    info!(product_id = %product.product_id, price = %product.price, "product added");
    Ok(product)
  }

  pub async fn get_product(&self, id: Uuid) -> Result<Product> {
    lift(self.store.get_product(id).await)?.ok_or(Error::not_found(Entity::Product, id))
  }

  pub async fn set_product_price(&self, actor: Actor, id: Uuid, price: Decimal) -> Result<Product> {
    actor.require_staff()?;
    let price = catalog::checked_price(price)?;
    let product = lift(self.store.set_product_price(id, price).await)?;
    info!(product_id = %id, price = %product.price, "product repriced");
    Ok(product)
  }

  pub async fn retire_product(&self, actor: Actor, id: Uuid) -> Result<()> {
    actor.require_staff()?;
    lift(self.store.retire_product(id).await)?;
    info!(product_id = %id, "product retired");
    Ok(())
  }

  // ── Addresses ─────────────────────────────────────────────────────────

  pub async fn create_address(&self, actor: Actor, owner_id: Uuid, input: NewAddress) -> Result<Address> {
    actor.act_for(owner_id)?;
    let address = lift(self.store.create_address(actor, owner_id, input).await)?;
    info!(
      address_id = %address.address_id,
      owner_id = %owner_id,
      is_default = address.is_default,
      "address created"
    );
    Ok(address)
  }

  pub async fn update_address(&self, actor: Actor, id: Uuid, patch: AddressPatch) -> Result<Address> {
    lift(self.store.update_address(actor, id, patch).await)
  }

  pub async fn set_default_address(&self, actor: Actor, id: Uuid) -> Result<Address> {
    let address = lift(self.store.set_default_address(actor, id).await)?;
    info!(address_id = %id, owner_id = %address.owner_id, "default address set");
    Ok(address)
  }

  pub async fn delete_address(&self, actor: Actor, id: Uuid) -> Result<AddressRemoval> {
    let removal = lift(self.store.delete_address(actor, id).await)?;
    info!(
      address_id = %id,
      promoted = ?removal.promoted.as_ref().map(|a| a.address_id),
      "address deleted"
    );
    Ok(removal)
  }

  pub async fn get_address(&self, actor: Actor, id: Uuid) -> Result<Address> {
    lift(self.store.get_address(actor, id).await)
  }

  pub async fn list_addresses(&self, actor: Actor, owner_id: Uuid) -> Result<Vec<Address>> {
    actor.act_for(owner_id)?;
    lift(self.store.list_addresses(actor, owner_id).await)
  }

  pub async fn default_address(&self, actor: Actor, owner_id: Uuid) -> Result<Option<Address>> {
    let addresses = self.list_addresses(actor, owner_id).await?;
    Ok(addresses.into_iter().find(|a| a.is_default))
  }

  // ── Cart ──────────────────────────────────────────────────────────────

  pub async fn add_to_cart(&self, actor: Actor, product_id: Uuid, quantity: i64) -> Result<CartItem> {
    let quantity = cart::checked_quantity(quantity)?;
    lift(self.store.add_to_cart(actor, product_id, quantity).await)
  }

  pub async fn set_cart_quantity(&self, actor: Actor, product_id: Uuid, quantity: i64) -> Result<CartItem> {
    let quantity = cart::checked_quantity(quantity)?;
    lift(self.store.set_cart_quantity(actor, product_id, quantity).await)
  }

  pub async fn remove_from_cart(&self, actor: Actor, product_id: Uuid) -> Result<()> {
    lift(self.store.remove_from_cart(actor, product_id).await)
  }

  pub async fn get_cart(&self, actor: Actor, owner_id: Uuid) -> Result<CartView> {
    actor.act_for(owner_id)?;
    lift(self.store.get_cart(actor, owner_id).await)
  }

  pub async fn place_order(&self, actor: Actor) -> Result<OrderView> {
    let view = lift(self.store.place_order(actor).await)?;
    let order = &view.order;
    info!(
      order_id = %order.order_id,
      owner_id = %order.owner_id,
      total_price = %order.total_price,
      items = view.items.len(),
      "order placed"
    );
    self.publish(Event::OrderPlaced {
      owner_id:    order.owner_id,
      order_id:    order.order_id,
      total_price: order.total_price,
    });
    Ok(view)
  }

  // ── Orders ────────────────────────────────────────────────────────────

  pub async fn get_order(&self, actor: Actor, id: Uuid) -> Result<OrderView> {
    lift(self.store.get_order(actor, id).await)
  }

  pub async fn list_orders(&self, actor: Actor, owner_id: Uuid) -> Result<Vec<Order>> {
    actor.act_for(owner_id)?;
    lift(self.store.list_orders(actor, owner_id).await)
  }

  pub async fn cancel_order(&self, actor: Actor, id: Uuid) -> Result<OrderTransition> {
    let transition = lift(self.store.transition_order(actor, id, OrderStatus::Cancelled).await)?;
    // Already committed, so this must not fail.
    let refunded = money::currency(
      transition
        .reversals
        .iter()
        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.amount)),
    );
    info!(order_id = %id, %refunded, reversals = transition.reversals.len(), "order cancelled");
    let order = &transition.order.order;
    self.publish(Event::OrderCancelled {
      owner_id: order.owner_id,
      order_id: order.order_id,
      refunded,
    });
    Ok(transition)
  }

  pub async fn ship_order(&self, actor: Actor, id: Uuid) -> Result<OrderTransition> {
    actor.require_staff()?;
    let transition = lift(self.store.transition_order(actor, id, OrderStatus::Shipped).await)?;
    info!(order_id = %id, "order shipped");
    let order = &transition.order.order;
    self.publish(Event::OrderShipped { owner_id: order.owner_id, order_id: order.order_id });
    Ok(transition)
  }

  pub async fn complete_order(&self, actor: Actor, id: Uuid) -> Result<OrderTransition> {
    actor.require_staff()?;
    let transition = lift(self.store.transition_order(actor, id, OrderStatus::Completed).await)?;
    info!(order_id = %id, "order completed");
    let order = &transition.order.order;
    self.publish(Event::OrderCompleted {
      owner_id:    order.owner_id,
      order_id:    order.order_id,
      total_price: order.total_price,
    });
    Ok(transition)
  }

  // ── Payments ──────────────────────────────────────────────────────────

  pub async fn create_payment(&self, actor: Actor, input: NewPayment) -> Result<PaymentOutcome> {
    if input.amount <= Decimal::ZERO {
      return Err(Error::InvalidAmount(input.amount));
    }
    let input = NewPayment { amount: money::checked(input.amount)?, ..input };
    let outcome = lift(self.store.create_payment(actor, input).await)?;
    info!(
      payment_id = %outcome.payment.payment_id,
      order_id = %outcome.payment.order_id,
      amount = %outcome.payment.amount,
      status = %outcome.payment.status,
      order_status = %outcome.order.order.status,
      "payment recorded"
    );
    self.publish_payment(&outcome);
    Ok(outcome)
  }

  pub async fn set_payment_status(&self, actor: Actor, id: Uuid, status: PaymentStatus) -> Result<PaymentOutcome> {
    actor.require_staff()?;
    let outcome = lift(self.store.set_payment_status(id, status).await)?;
    info!(
      payment_id = %id,
      status = %status,
      order_status = %outcome.order.order.status,
      "payment settled"
    );
    if status == PaymentStatus::Completed && outcome.order.order.status == OrderStatus::Cancelled {
      warn!(
        payment_id = %id,
        order_id = %outcome.order.order.order_id,
        "payment completed against a cancelled order; order left cancelled"
      );
    }
    self.publish_payment(&outcome);
    Ok(outcome)
  }

  pub async fn refund_payment(&self, actor: Actor, id: Uuid) -> Result<PaymentOutcome> {
    let outcome = lift(self.store.refund_payment(actor, id).await)?;
    info!(
      payment_id = %id,
      amount = %outcome.payment.amount,
      order_status = %outcome.order.order.status,
      total_paid = %outcome.order.total_paid,
      "payment refunded"
    );
    self.publish_payment(&outcome);
    Ok(outcome)
  }

  pub async fn get_payment(&self, actor: Actor, id: Uuid) -> Result<Payment> {
    lift(self.store.get_payment(actor, id).await)
  }

  fn publish_payment(&self, outcome: &PaymentOutcome) {
    let payment = &outcome.payment;
    let order = &outcome.order.order;
    match payment.status {
      PaymentStatus::Completed => self.publish(Event::PaymentCompleted {
        owner_id:   order.owner_id,
        order_id:   order.order_id,
        payment_id: payment.payment_id,
        amount:     payment.amount,
      }),
      PaymentStatus::Refunded => self.publish(Event::PaymentRefunded {
        owner_id:     order.owner_id,
        order_id:     order.order_id,
        payment_id:   payment.payment_id,
        amount:       payment.amount,
        order_status: order.status,
      }),
      PaymentStatus::Pending | PaymentStatus::Failed => {}
    }
    if outcome.status_changed() && order.status == OrderStatus::Paid {
      self.publish(Event::OrderPaid {
        owner_id:    order.owner_id,
        order_id:    order.order_id,
        total_price: order.total_price,
      });
    }
  }

  // ── Discounts ─────────────────────────────────────────────────────────

  pub async fn create_discount(&self, actor: Actor, input: NewDiscount) -> Result<Discount> {
    actor.require_staff()?;
    let discount = input.into_discount(Utc::now())?;
    let discount = lift(self.store.create_discount(discount).await)?;
    info!(discount_id = %discount.discount_id, code = %discount.code, "discount created");
    Ok(discount)
  }

  pub async fn get_discount(&self, id: Uuid) -> Result<Discount> {
    lift(self.store.get_discount(id).await)?.ok_or(Error::not_found(Entity::Discount, id))
  }

  /// Preview a code against `order_total` for the actor. Nothing is
  /// consumed.
  pub async fn validate_discount(&self, actor: Actor, code: &str, order_total: Decimal) -> Result<DiscountQuote> {
    if order_total.is_sign_negative() && !order_total.is_zero() {
      return Err(Error::InvalidAmount(order_total));
    }
    let order_total = money::checked(order_total)?;
    let code = code.trim();
    let usage = lift(self.store.discount_usage(code, actor.user_id).await)?
      .ok_or_else(|| Error::InvalidCode(code.to_owned()))?;
    if let Err(e) = discount::validate(&usage, order_total, Utc::now()) {
      debug!(code, error = %e, "discount rejected");
      return Err(e);
    }
    discount::quote(&usage.discount, order_total)
  }

  pub async fn commit_redemption(&self, actor: Actor, input: NewRedemption) -> Result<Redemption> {
    actor.act_for(input.owner_id)?;
    if input.amount_applied.is_sign_negative() && !input.amount_applied.is_zero() {
      return Err(Error::InvalidAmount(input.amount_applied));
    }
    let input = NewRedemption { amount_applied: money::checked(input.amount_applied)?, ..input };
    let redemption = lift(self.store.commit_redemption(actor, input).await)?;
    info!(
      redemption_id = %redemption.redemption_id,
      discount_id = %redemption.discount_id,
      owner_id = %redemption.owner_id,
      "discount redeemed"
    );
    self.publish(Event::DiscountRedeemed {
      owner_id:       redemption.owner_id,
      discount_id:    redemption.discount_id,
      order_id:       redemption.order_id,
      amount_applied: redemption.amount_applied,
    });
    Ok(redemption)
  }
}
