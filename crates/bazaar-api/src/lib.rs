//! JSON REST API for Bazaar.
//!
//! Exposes an axum [`Router`] over a [`Commerce`] orchestrator backed by any
//! [`CommerceStore`]. Authentication, TLS, and transport concerns are the
//! caller's responsibility; the acting user arrives in request headers (see
//! [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bazaar_api::api_router(commerce.clone()))
//! ```

pub mod actor;
pub mod addresses;
pub mod cart;
pub mod discounts;
pub mod error;
pub mod orders;
pub mod payments;
pub mod products;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use bazaar_core::{Commerce, store::CommerceStore};

pub use actor::Caller;
pub use error::ApiError;

/// Build a fully-materialised API router for `commerce`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(commerce: Arc<Commerce<S>>) -> Router<()>
where
  S: CommerceStore + 'static,
{
  Router::new()
    // Catalog
    .route("/products", post(products::create::<S>))
    .route("/products/{id}", get(products::get_one::<S>).delete(products::retire::<S>))
    .route("/products/{id}/price", put(products::set_price::<S>))
    // Addresses
    .route("/addresses", get(addresses::list::<S>).post(addresses::create::<S>))
    .route("/addresses/default", get(addresses::default_one::<S>))
    .route(
      "/addresses/{id}",
      get(addresses::get_one::<S>)
        .patch(addresses::update::<S>)
        .delete(addresses::delete::<S>),
    )
    .route("/addresses/{id}/default", post(addresses::set_default::<S>))
    // Cart
    .route("/cart", get(cart::get::<S>))
    .route("/cart/items", post(cart::add_item::<S>))
    .route(
      "/cart/items/{product_id}",
      put(cart::set_quantity::<S>).delete(cart::remove_item::<S>),
    )
    // Orders
    .route("/orders", get(orders::list::<S>).post(orders::place::<S>))
    .route("/orders/{id}", get(orders::get_one::<S>))
    .route("/orders/{id}/cancel", post(orders::cancel::<S>))
    .route("/orders/{id}/ship", post(orders::ship::<S>))
    .route("/orders/{id}/complete", post(orders::complete::<S>))
    // Payments
    .route("/payments", post(payments::create::<S>))
    .route("/payments/{id}", get(payments::get_one::<S>))
    .route("/payments/{id}/status", post(payments::set_status::<S>))
    .route("/payments/{id}/refund", post(payments::refund::<S>))
    // Discounts
    .route("/discounts", post(discounts::create::<S>))
    .route("/discounts/validate", post(discounts::validate::<S>))
    .route("/discounts/{id}", get(discounts::get_one::<S>))
    .route("/discounts/{id}/redeem", post(discounts::redeem::<S>))
    .with_state(commerce)
}
