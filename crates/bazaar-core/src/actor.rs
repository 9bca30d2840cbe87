//! The acting user of an operation.
//!
//! Every core operation takes the actor explicitly; nothing reads an ambient
//! "current user".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Entity, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id:  Uuid,
  pub is_staff: bool,
}

impl Actor {
  pub fn customer(user_id: Uuid) -> Self { Self { user_id, is_staff: false } }

  pub fn staff(user_id: Uuid) -> Self { Self { user_id, is_staff: true } }

  /// Whether the actor may touch records belonging to `owner_id`.
  pub fn can_access(&self, owner_id: Uuid) -> bool {
    self.is_staff || self.user_id == owner_id
  }

  /// Gate access to an existing record owned by `owner_id`.
  ///
  /// Foreign records are reported as missing so that their existence does
  /// not leak to other customers.
  pub fn scope(&self, owner_id: Uuid, entity: Entity, id: Uuid) -> Result<()> {
    if self.can_access(owner_id) {
      Ok(())
    } else {
      Err(Error::not_found(entity, id))
    }
  }

  /// Gate an operation that names `owner_id` explicitly as its target.
  pub fn act_for(&self, owner_id: Uuid) -> Result<()> {
    if self.can_access(owner_id) {
      Ok(())
    } else {
      Err(Error::Forbidden(owner_id))
    }
  }

  pub fn require_staff(&self) -> Result<()> {
    if self.is_staff {
      Ok(())
    } else {
      Err(Error::Forbidden(self.user_id))
    }
  }
}
