//! Addresses and the default-address toggle.
//!
//! An owner has at most one default address. The rules here only decide
//! which flags change; the store applies the returned changes inside the same
//! transaction that loaded the owner's addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressType {
  Billing,
  Shipping,
  Work,
  #[default]
  Home,
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub address_id:     Uuid,
  pub owner_id:       Uuid,
  pub address_type:   AddressType,
  pub recipient_name: String,
  pub street:         String,
  pub city:           String,
  pub postal_code:    String,
  pub country:        String,
  pub is_default:     bool,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::CommerceStore::create_address`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAddress {
  #[serde(default)]
  pub address_type:   AddressType,
  pub recipient_name: String,
  pub street:         String,
  pub city:           String,
  pub postal_code:    String,
  pub country:        String,
  #[serde(default)]
  pub is_default:     bool,
}

/// Partial update. `None` leaves a field untouched.
///
/// `is_default: Some(true)` runs the toggle, `Some(false)` clears the flag
/// and may leave the owner without a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPatch {
  pub address_type:   Option<AddressType>,
  pub recipient_name: Option<String>,
  pub street:         Option<String>,
  pub city:           Option<String>,
  pub postal_code:    Option<String>,
  pub country:        Option<String>,
  pub is_default:     Option<bool>,
}

impl AddressPatch {
  /// Apply the non-flag fields to `address`.
  pub fn apply_fields(&self, address: &mut Address) {
    if let Some(t) = self.address_type {
      address.address_type = t;
    }
    if let Some(v) = &self.recipient_name {
      address.recipient_name.clone_from(v);
    }
    if let Some(v) = &self.street {
      address.street.clone_from(v);
    }
    if let Some(v) = &self.city {
      address.city.clone_from(v);
    }
    if let Some(v) = &self.postal_code {
      address.postal_code.clone_from(v);
    }
    if let Some(v) = &self.country {
      address.country.clone_from(v);
    }
  }
}

/// Result of deleting an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRemoval {
  pub removed:  Address,
  /// The address promoted to default, if the removed one was the default
  /// and any address remained.
  pub promoted: Option<Address>,
}

/// A single flag write produced by [`default_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
  pub address_id: Uuid,
  pub is_default: bool,
}

/// The flag writes that make `target` the only default among `owned`.
///
/// Clears come before the set so that a storage-level "one default per
/// owner" constraint is never violated mid-transaction. Returns no changes
/// when `target` is already the sole default.
pub fn default_changes(owned: &[Address], target: Uuid) -> Vec<FlagChange> {
  let mut changes: Vec<FlagChange> = owned
    .iter()
    .filter(|a| a.is_default && a.address_id != target)
    .map(|a| FlagChange { address_id: a.address_id, is_default: false })
    .collect();

  let already = owned.iter().any(|a| a.address_id == target && a.is_default);
  if !already {
    changes.push(FlagChange { address_id: target, is_default: true });
  }
  changes
}

/// Pick the replacement default after a default address is removed: the
/// remaining address with the latest `created_at`.
///
/// `remaining` is expected in insertion order; on equal timestamps the later
/// row wins.
pub fn promotion_candidate(remaining: &[Address]) -> Option<&Address> {
  remaining.iter().max_by_key(|a| a.created_at)
}
