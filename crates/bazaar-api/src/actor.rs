//! Request-header extractor for the acting user.
//!
//! Authentication happens upstream; this adapter trusts `x-actor-id` (a
//! UUID) and the optional `x-actor-staff: true` flag.

use axum::{extract::FromRequestParts, http::request::Parts};
use bazaar_core::Actor;
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_STAFF_HEADER: &str = "x-actor-staff";

/// The [`Actor`] a request runs as.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl<S> FromRequestParts<S> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get(ACTOR_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| Uuid::parse_str(v.trim()).ok())
      .ok_or(ApiError::Unauthenticated)?;

    let is_staff = parts
      .headers
      .get(ACTOR_STAFF_HEADER)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    Ok(Caller(Actor { user_id, is_staff }))
  }
}
