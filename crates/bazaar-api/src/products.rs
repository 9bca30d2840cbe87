//! Handlers for `/products` endpoints. Mutations are staff-only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/products` | Body: `{"name":"Mug","price":"12.50"}` |
//! | `GET`    | `/products/{id}` | 404 if not found |
//! | `PUT`    | `/products/{id}/price` | Body: `{"price":"9.99"}` |
//! | `DELETE` | `/products/{id}` | 204; existing carts keep the dangling line |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Commerce,
  catalog::{NewProduct, Product},
  store::CommerceStore,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

/// `POST /products`
pub async fn create<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let product = commerce.add_product(actor, body).await?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/{id}`
pub async fn get_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_product(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PriceBody {
  pub price: Decimal,
}

/// `PUT /products/{id}/price`
pub async fn set_price<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<PriceBody>,
) -> Result<Json<Product>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.set_product_price(actor, id, body.price).await?))
}

/// `DELETE /products/{id}`
pub async fn retire<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CommerceStore + 'static,
{
  commerce.retire_product(actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
