//! Handlers for the caller's own cart.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/cart` | Lines priced at the current catalog price |
//! | `POST`   | `/cart/items` | Body: `{"product_id":"…","quantity":2}`; merges into an existing line |
//! | `PUT`    | `/cart/items/{product_id}` | Body: `{"quantity":3}` |
//! | `DELETE` | `/cart/items/{product_id}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Commerce,
  cart::{CartItem, CartView},
  store::CommerceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

/// `GET /cart`
pub async fn get<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
) -> Result<Json<CartView>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_cart(actor, actor.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddBody {
  pub product_id: Uuid,
  #[serde(default = "one")]
  pub quantity:   i64,
}

fn one() -> i64 { 1 }

/// `POST /cart/items`
pub async fn add_item<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Json(body): Json<AddBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let item = commerce.add_to_cart(actor, body.product_id, body.quantity).await?;
  Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
  pub quantity: i64,
}

/// `PUT /cart/items/{product_id}`
pub async fn set_quantity<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(product_id): Path<Uuid>,
  Json(body): Json<QuantityBody>,
) -> Result<Json<CartItem>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.set_cart_quantity(actor, product_id, body.quantity).await?))
}

/// `DELETE /cart/items/{product_id}`
pub async fn remove_item<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CommerceStore + 'static,
{
  commerce.remove_from_cart(actor, product_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
