use chrono::Utc;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use bazaar_core::{
  Entity, Error as CoreError,
  catalog::{NewProduct, Product},
};

use super::query_one;
use crate::{
  Result,
  encode::{RawProduct, encode_dt, encode_money, encode_uuid},
};

pub fn find(conn: &Connection, id: Uuid) -> Result<Option<Product>> {
  let sql = format!("SELECT {} FROM products WHERE product_id = ?1", RawProduct::COLUMNS);
  query_one(conn, &sql, params![encode_uuid(id)], RawProduct::from_row)?
    .map(RawProduct::into_product)
    .transpose()
}

pub fn insert(conn: &Connection, input: NewProduct) -> Result<Product> {
  let product = Product {
    product_id: Uuid::new_v4(),
    name:       input.name,
    price:      input.price,
    created_at: Utc::now(),
  };
  conn.execute(
    "INSERT INTO products (product_id, name, price, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(product.product_id),
      product.name,
      encode_money(product.price),
      encode_dt(product.created_at),
    ],
  )?;
  Ok(product)
}

pub fn set_price(conn: &Connection, id: Uuid, price: Decimal) -> Result<Product> {
  let changed = conn.execute(
    "UPDATE products SET price = ?2 WHERE product_id = ?1",
    params![encode_uuid(id), encode_money(price)],
  )?;
  if changed == 0 {
    return Err(CoreError::not_found(Entity::Product, id).into());
  }
  find(conn, id)?.ok_or_else(|| CoreError::not_found(Entity::Product, id).into())
}

pub fn retire(conn: &Connection, id: Uuid) -> Result<()> {
  let changed = conn.execute(
    "DELETE FROM products WHERE product_id = ?1",
    params![encode_uuid(id)],
  )?;
  if changed == 0 {
    return Err(CoreError::not_found(Entity::Product, id).into());
  }
  Ok(())
}
