//! Handlers for `/discounts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/discounts` | Staff only; 409 `DUPLICATE_CODE` on a case-insensitive clash |
//! | `GET`  | `/discounts/{id}` | |
//! | `POST` | `/discounts/validate` | Body: `{"code":"SAVE10","order_total":"100.00"}`; consumes nothing |
//! | `POST` | `/discounts/{id}/redeem` | Body: `{"order_id":"…","amount_applied":"10.00"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Commerce,
  discount::{Discount, DiscountQuote, NewDiscount, NewRedemption},
  store::CommerceStore,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

/// `POST /discounts`
pub async fn create<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Json(body): Json<NewDiscount>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let discount = commerce.create_discount(actor, body).await?;
  Ok((StatusCode::CREATED, Json(discount)))
}

/// `GET /discounts/{id}`
pub async fn get_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Discount>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_discount(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
  pub code:        String,
  pub order_total: Decimal,
}

/// `POST /discounts/validate`
pub async fn validate<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Json(body): Json<ValidateBody>,
) -> Result<Json<DiscountQuote>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.validate_discount(actor, &body.code, body.order_total).await?))
}

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  /// Defaults to the caller.
  pub owner_id:       Option<Uuid>,
  pub order_id:       Option<Uuid>,
  pub amount_applied: Decimal,
}

/// `POST /discounts/{id}/redeem`
pub async fn redeem<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(discount_id): Path<Uuid>,
  Json(body): Json<RedeemBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let input = NewRedemption {
    discount_id,
    owner_id: body.owner_id.unwrap_or(actor.user_id),
    order_id: body.order_id,
    amount_applied: body.amount_applied,
  };
  let redemption = commerce.commit_redemption(actor, input).await?;
  Ok((StatusCode::CREATED, Json(redemption)))
}
