//! Handlers for `/orders` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/orders` | Newest first; staff may pass `?owner_id=` |
//! | `POST` | `/orders` | Places the caller's cart; 422 `EMPTY_CART` when there is nothing to place |
//! | `GET`  | `/orders/{id}` | Items, payments and derived balance |
//! | `POST` | `/orders/{id}/cancel` | Owner or staff; reverses completed charges |
//! | `POST` | `/orders/{id}/ship` | Staff only |
//! | `POST` | `/orders/{id}/complete` | Staff only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Commerce,
  order::{Order, OrderTransition, OrderView},
  store::CommerceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub owner_id: Option<Uuid>,
}

/// `GET /orders[?owner_id=<uuid>]`
pub async fn list<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Order>>, ApiError>
where
  S: CommerceStore + 'static,
{
  let owner_id = params.owner_id.unwrap_or(actor.user_id);
  Ok(Json(commerce.list_orders(actor, owner_id).await?))
}

/// `POST /orders`
pub async fn place<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let view = commerce.place_order(actor).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /orders/{id}`
pub async fn get_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_order(actor, id).await?))
}

// ─── Workflow ─────────────────────────────────────────────────────────────────

/// `POST /orders/{id}/cancel`
pub async fn cancel<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<OrderTransition>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.cancel_order(actor, id).await?))
}

/// `POST /orders/{id}/ship`
pub async fn ship<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<OrderTransition>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.ship_order(actor, id).await?))
}

/// `POST /orders/{id}/complete`
pub async fn complete<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<OrderTransition>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.complete_order(actor, id).await?))
}
