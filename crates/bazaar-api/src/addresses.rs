//! Handlers for `/addresses` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/addresses` | Own addresses, default first; staff may pass `?owner_id=` |
//! | `POST`   | `/addresses` | Same `?owner_id=` rule; `"is_default": true` runs the toggle |
//! | `GET`    | `/addresses/default` | `null` when the owner has no default |
//! | `GET`    | `/addresses/{id}` | 404 for missing or foreign addresses |
//! | `PATCH`  | `/addresses/{id}` | Partial update |
//! | `DELETE` | `/addresses/{id}` | Returns the removed and promoted addresses |
//! | `POST`   | `/addresses/{id}/default` | Make this the owner's only default |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Actor, Commerce,
  address::{Address, AddressPatch, AddressRemoval, NewAddress},
  store::CommerceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct OwnerParams {
  pub owner_id: Option<Uuid>,
}

impl OwnerParams {
  fn resolve(&self, actor: Actor) -> Uuid { self.owner_id.unwrap_or(actor.user_id) }
}

// ─── Collection ───────────────────────────────────────────────────────────────

/// `GET /addresses[?owner_id=<uuid>]`
pub async fn list<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Query(params): Query<OwnerParams>,
) -> Result<Json<Vec<Address>>, ApiError>
where
  S: CommerceStore + 'static,
{
  let owner_id = params.resolve(actor);
  Ok(Json(commerce.list_addresses(actor, owner_id).await?))
}

/// `POST /addresses[?owner_id=<uuid>]`
pub async fn create<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Query(params): Query<OwnerParams>,
  Json(body): Json<NewAddress>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let owner_id = params.resolve(actor);
  let address = commerce.create_address(actor, owner_id, body).await?;
  Ok((StatusCode::CREATED, Json(address)))
}

/// `GET /addresses/default[?owner_id=<uuid>]`
pub async fn default_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Query(params): Query<OwnerParams>,
) -> Result<Json<Option<Address>>, ApiError>
where
  S: CommerceStore + 'static,
{
  let owner_id = params.resolve(actor);
  Ok(Json(commerce.default_address(actor, owner_id).await?))
}

// ─── Single address ───────────────────────────────────────────────────────────

/// `GET /addresses/{id}`
pub async fn get_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Address>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_address(actor, id).await?))
}

/// `PATCH /addresses/{id}`
pub async fn update<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(patch): Json<AddressPatch>,
) -> Result<Json<Address>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.update_address(actor, id, patch).await?))
}

/// `DELETE /addresses/{id}`
pub async fn delete<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<AddressRemoval>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.delete_address(actor, id).await?))
}

/// `POST /addresses/{id}/default`
pub async fn set_default<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Address>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.set_default_address(actor, id).await?))
}
