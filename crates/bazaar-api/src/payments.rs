//! Handlers for `/payments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/payments` | Body: `{"order_id":"…","amount":"20.00","gateway":"card"}` |
//! | `GET`  | `/payments/{id}` | 404 for missing or foreign payments |
//! | `POST` | `/payments/{id}/status` | Staff only (gateway callback); body: `{"status":"completed"}` |
//! | `POST` | `/payments/{id}/refund` | Marks a completed charge refunded |
//!
//! Every mutation answers with the payment, the recomputed order view and
//! the order status before the change.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bazaar_core::{
  Commerce,
  order::{NewPayment, Payment, PaymentOutcome, PaymentStatus},
  store::CommerceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Caller, error::ApiError};

/// `POST /payments`
pub async fn create<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Json(body): Json<NewPayment>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommerceStore + 'static,
{
  let outcome = commerce.create_payment(actor, body).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /payments/{id}`
pub async fn get_one<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.get_payment(actor, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: PaymentStatus,
}

/// `POST /payments/{id}/status`
pub async fn set_status<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<PaymentOutcome>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.set_payment_status(actor, id, body.status).await?))
}

/// `POST /payments/{id}/refund`
pub async fn refund<S>(
  State(commerce): State<Arc<Commerce<S>>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<PaymentOutcome>, ApiError>
where
  S: CommerceStore + 'static,
{
  Ok(Json(commerce.refund_payment(actor, id).await?))
}
