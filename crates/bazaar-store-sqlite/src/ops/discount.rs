use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use bazaar_core::{
  Actor, Entity, Error as CoreError,
  discount::{self, Discount, DiscountUsage, NewRedemption, Redemption},
};

use super::{order, query_one};
use crate::{
  Error, Result,
  encode::{RawDiscount, decode_count, encode_dt, encode_enum, encode_money, encode_uuid},
  error::is_unique_violation,
};

pub fn find(conn: &Connection, id: Uuid) -> Result<Option<Discount>> {
  let sql = format!("SELECT {} FROM discounts WHERE discount_id = ?1", RawDiscount::COLUMNS);
  query_one(conn, &sql, params![encode_uuid(id)], RawDiscount::from_row)?
    .map(RawDiscount::into_discount)
    .transpose()
}

/// Case-insensitive lookup; the column is declared `COLLATE NOCASE`.
fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Discount>> {
  let sql = format!("SELECT {} FROM discounts WHERE code = ?1", RawDiscount::COLUMNS);
  query_one(conn, &sql, params![code], RawDiscount::from_row)?
    .map(RawDiscount::into_discount)
    .transpose()
}

fn redeemed_by(conn: &Connection, discount_id: Uuid, owner_id: Uuid) -> Result<u32> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM discount_redemptions WHERE discount_id = ?1 AND owner_id = ?2",
    params![encode_uuid(discount_id), encode_uuid(owner_id)],
    |row| row.get(0),
  )?;
  decode_count("redemptions", n)
}

pub fn insert(conn: &Connection, discount: Discount) -> Result<Discount> {
  conn
    .execute(
      "INSERT INTO discounts (
         discount_id, code, description, discount_type, amount, min_order_value,
         usage_limit, used_count, per_user_limit, is_active, valid_from, valid_until, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
      params![
        encode_uuid(discount.discount_id),
        discount.code,
        discount.description,
        encode_enum(discount.discount_type),
        discount.amount.to_string(),
        discount.min_order_value.map(encode_money),
        discount.usage_limit.map(i64::from),
        i64::from(discount.used_count),
        discount.per_user_limit.map(i64::from),
        discount.is_active,
        encode_dt(discount.valid_from),
        discount.valid_until.map(encode_dt),
        encode_dt(discount.created_at),
      ],
    )
    .map_err(|e| -> Error {
      if is_unique_violation(&e) {
        CoreError::DuplicateCode(discount.code.clone()).into()
      } else {
        e.into()
      }
    })?;
  Ok(discount)
}

pub fn usage(conn: &Connection, code: &str, owner_id: Uuid) -> Result<Option<DiscountUsage>> {
  let Some(discount) = find_by_code(conn, code)? else {
    return Ok(None);
  };
  let redeemed_by_owner = redeemed_by(conn, discount.discount_id, owner_id)?;
  Ok(Some(DiscountUsage { discount, redeemed_by_owner }))
}

fn already_redeemed(conn: &Connection, input: &NewRedemption) -> Result<bool> {
  // NULL order ids are distinct, so only order-bound redemptions can clash.
  let Some(order_id) = input.order_id else {
    return Ok(false);
  };
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM discount_redemptions
         WHERE discount_id = ?1 AND owner_id = ?2 AND order_id = ?3",
        params![
          encode_uuid(input.discount_id),
          encode_uuid(input.owner_id),
          encode_uuid(order_id),
        ],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// Record a redemption and consume one use, re-checking both caps while the
/// write lock is held.
pub fn commit(conn: &Connection, actor: Actor, input: NewRedemption) -> Result<Redemption> {
  let discount_id = input.discount_id;
  let discount = find(conn, discount_id)?.ok_or(CoreError::not_found(Entity::Discount, discount_id))?;

  if let Some(order_id) = input.order_id {
    let order = order::load_scoped(conn, actor, order_id)?;
    if order.owner_id != input.owner_id {
      return Err(CoreError::not_found(Entity::Order, order_id).into());
    }
  }

  if already_redeemed(conn, &input)? {
    return Err(CoreError::DuplicateRedemption { discount_id }.into());
  }
  discount::check_capacity(&discount, redeemed_by(conn, discount_id, input.owner_id)?)?;

  let redemption = Redemption {
    redemption_id:  Uuid::new_v4(),
    discount_id,
    owner_id:       input.owner_id,
    order_id:       input.order_id,
    amount_applied: input.amount_applied,
    created_at:     Utc::now(),
  };
  conn
    .execute(
      "INSERT INTO discount_redemptions (
         redemption_id, discount_id, owner_id, order_id, amount_applied, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        encode_uuid(redemption.redemption_id),
        encode_uuid(discount_id),
        encode_uuid(redemption.owner_id),
        redemption.order_id.map(encode_uuid),
        encode_money(redemption.amount_applied),
        encode_dt(redemption.created_at),
      ],
    )
    .map_err(|e| -> Error {
      if is_unique_violation(&e) {
        CoreError::DuplicateRedemption { discount_id }.into()
      } else {
        e.into()
      }
    })?;

  let bumped = conn.execute(
    "UPDATE discounts SET used_count = used_count + 1
     WHERE discount_id = ?1 AND (usage_limit IS NULL OR used_count < usage_limit)",
    params![encode_uuid(discount_id)],
  )?;
  if bumped != 1 {
    let limit = discount.usage_limit.unwrap_or(discount.used_count);
    return Err(CoreError::GlobalLimitReached(limit).into());
  }

  Ok(redemption)
}
