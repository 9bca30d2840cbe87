use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use bazaar_core::{
  Actor, Entity, Error as CoreError,
  address::{self, Address, AddressPatch, AddressRemoval, FlagChange, NewAddress},
};

use super::{query_all, query_one};
use crate::{
  Error, Result,
  encode::{RawAddress, encode_dt, encode_enum, encode_uuid},
  error::is_unique_violation,
};

fn duplicate_or(e: rusqlite::Error) -> Error {
  if is_unique_violation(&e) {
    CoreError::DuplicateAddress.into()
  } else {
    e.into()
  }
}

fn find(conn: &Connection, id: Uuid) -> Result<Option<Address>> {
  let sql = format!("SELECT {} FROM addresses WHERE address_id = ?1", RawAddress::COLUMNS);
  query_one(conn, &sql, params![encode_uuid(id)], RawAddress::from_row)?
    .map(RawAddress::into_address)
    .transpose()
}

/// Load an address the actor may see, or report it missing.
pub fn load_scoped(conn: &Connection, actor: Actor, id: Uuid) -> Result<Address> {
  let address = find(conn, id)?.ok_or(CoreError::not_found(Entity::Address, id))?;
  actor.scope(address.owner_id, Entity::Address, id)?;
  Ok(address)
}

/// All of an owner's addresses in insertion order.
fn owned(conn: &Connection, owner_id: Uuid) -> Result<Vec<Address>> {
  let sql = format!(
    "SELECT {} FROM addresses WHERE owner_id = ?1 ORDER BY created_at, rowid",
    RawAddress::COLUMNS
  );
  query_all(conn, &sql, params![encode_uuid(owner_id)], RawAddress::from_row)?
    .into_iter()
    .map(RawAddress::into_address)
    .collect()
}

fn apply_flags(conn: &Connection, changes: &[FlagChange]) -> Result<()> {
  let mut stmt = conn.prepare("UPDATE addresses SET is_default = ?2 WHERE address_id = ?1")?;
  for change in changes {
    stmt.execute(params![encode_uuid(change.address_id), change.is_default])?;
  }
  Ok(())
}

/// Make `target` the owner's only default.
fn make_default(conn: &Connection, owner_id: Uuid, target: Uuid) -> Result<()> {
  let changes = address::default_changes(&owned(conn, owner_id)?, target);
  apply_flags(conn, &changes)
}

pub fn list(conn: &Connection, owner_id: Uuid) -> Result<Vec<Address>> {
  let sql = format!(
    "SELECT {} FROM addresses WHERE owner_id = ?1
     ORDER BY is_default DESC, created_at DESC, rowid DESC",
    RawAddress::COLUMNS
  );
  query_all(conn, &sql, params![encode_uuid(owner_id)], RawAddress::from_row)?
    .into_iter()
    .map(RawAddress::into_address)
    .collect()
}

pub fn create(conn: &Connection, owner_id: Uuid, input: NewAddress) -> Result<Address> {
  let mut address = Address {
    address_id:     Uuid::new_v4(),
    owner_id,
    address_type:   input.address_type,
    recipient_name: input.recipient_name,
    street:         input.street,
    city:           input.city,
    postal_code:    input.postal_code,
    country:        input.country,
    is_default:     false,
    created_at:     Utc::now(),
  };

  conn
    .execute(
      "INSERT INTO addresses (
         address_id, owner_id, address_type, recipient_name, street,
         city, postal_code, country, is_default, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
      params![
        encode_uuid(address.address_id),
        encode_uuid(owner_id),
        encode_enum(address.address_type),
        address.recipient_name,
        address.street,
        address.city,
        address.postal_code,
        address.country,
        encode_dt(address.created_at),
      ],
    )
    .map_err(duplicate_or)?;

  if input.is_default {
    make_default(conn, owner_id, address.address_id)?;
    address.is_default = true;
  }
  Ok(address)
}

pub fn update(conn: &Connection, actor: Actor, id: Uuid, patch: AddressPatch) -> Result<Address> {
  let mut address = load_scoped(conn, actor, id)?;
  patch.apply_fields(&mut address);

  conn
    .execute(
      "UPDATE addresses SET
         address_type = ?2, recipient_name = ?3, street = ?4,
         city = ?5, postal_code = ?6, country = ?7
       WHERE address_id = ?1",
      params![
        encode_uuid(id),
        encode_enum(address.address_type),
        address.recipient_name,
        address.street,
        address.city,
        address.postal_code,
        address.country,
      ],
    )
    .map_err(duplicate_or)?;

  match patch.is_default {
    Some(true) => {
      make_default(conn, address.owner_id, id)?;
      address.is_default = true;
    }
    Some(false) => {
      apply_flags(conn, &[FlagChange { address_id: id, is_default: false }])?;
      address.is_default = false;
    }
    None => {}
  }
  Ok(address)
}

pub fn set_default(conn: &Connection, actor: Actor, id: Uuid) -> Result<Address> {
  let mut address = load_scoped(conn, actor, id)?;
  make_default(conn, address.owner_id, id)?;
  address.is_default = true;
  Ok(address)
}

pub fn delete(conn: &Connection, actor: Actor, id: Uuid) -> Result<AddressRemoval> {
  let removed = load_scoped(conn, actor, id)?;
  conn.execute("DELETE FROM addresses WHERE address_id = ?1", params![encode_uuid(id)])?;

  let promoted = if removed.is_default {
    let remaining = owned(conn, removed.owner_id)?;
    match address::promotion_candidate(&remaining).cloned() {
      Some(mut next) => {
        make_default(conn, removed.owner_id, next.address_id)?;
        next.is_default = true;
        Some(next)
      }
      None => None,
    }
  } else {
    None
  };

  Ok(AddressRemoval { removed, promoted })
}
