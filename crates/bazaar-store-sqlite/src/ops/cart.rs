use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use bazaar_core::{
  Entity, Error as CoreError,
  cart::{self, CartItem, CartView},
  catalog::Product,
  order::{Order, OrderItem, OrderStatus, OrderView},
};

use super::{catalog, query_all};
use crate::{
  Result,
  encode::{RawCartItem, decode_uuid, encode_dt, encode_enum, encode_money, encode_uuid},
};

fn cart_id(conn: &Connection, owner_id: Uuid) -> Result<Option<Uuid>> {
  conn
    .query_row(
      "SELECT cart_id FROM carts WHERE owner_id = ?1",
      params![encode_uuid(owner_id)],
      |row| row.get::<_, String>(0),
    )
    .optional()?
    .as_deref()
    .map(decode_uuid)
    .transpose()
}

/// The owner's cart, created on first use.
fn ensure_cart(conn: &Connection, owner_id: Uuid) -> Result<Uuid> {
  if let Some(id) = cart_id(conn, owner_id)? {
    return Ok(id);
  }
  let id = Uuid::new_v4();
  conn.execute(
    "INSERT INTO carts (cart_id, owner_id, created_at) VALUES (?1, ?2, ?3)",
    params![encode_uuid(id), encode_uuid(owner_id), encode_dt(Utc::now())],
  )?;
  Ok(id)
}

/// Cart lines in the order they were first added, each with its product if
/// the product still exists.
fn lines(conn: &Connection, cart_id: Uuid) -> Result<Vec<(CartItem, Option<Product>)>> {
  let raws = query_all(
    conn,
    "SELECT cart_id, product_id, quantity FROM cart_items
     WHERE cart_id = ?1 ORDER BY added_at, rowid",
    params![encode_uuid(cart_id)],
    |row| {
      Ok(RawCartItem {
        cart_id:    row.get(0)?,
        product_id: row.get(1)?,
        quantity:   row.get(2)?,
      })
    },
  )?;

  raws
    .into_iter()
    .map(|raw| {
      let item = raw.into_item()?;
      let product = catalog::find(conn, item.product_id)?;
      Ok((item, product))
    })
    .collect()
}

fn write_quantity(conn: &Connection, cart_id: Uuid, product_id: Uuid, quantity: u32) -> Result<()> {
  conn.execute(
    "INSERT INTO cart_items (cart_id, product_id, quantity, added_at) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = excluded.quantity",
    params![
      encode_uuid(cart_id),
      encode_uuid(product_id),
      i64::from(quantity),
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

fn current_quantity(conn: &Connection, cart_id: Uuid, product_id: Uuid) -> Result<Option<u32>> {
  let quantity: Option<i64> = conn
    .query_row(
      "SELECT quantity FROM cart_items WHERE cart_id = ?1 AND product_id = ?2",
      params![encode_uuid(cart_id), encode_uuid(product_id)],
      |row| row.get(0),
    )
    .optional()?;
  quantity
    .map(|q| crate::encode::decode_count("quantity", q))
    .transpose()
}

pub fn add(conn: &Connection, owner_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartItem> {
  if catalog::find(conn, product_id)?.is_none() {
    return Err(CoreError::not_found(Entity::Product, product_id).into());
  }
  let cart_id = ensure_cart(conn, owner_id)?;
  let existing = current_quantity(conn, cart_id, product_id)?.unwrap_or(0);
  let merged = existing.checked_add(quantity).ok_or(CoreError::InvalidQuantity(
    i64::from(existing) + i64::from(quantity),
  ))?;
  write_quantity(conn, cart_id, product_id, merged)?;
  Ok(CartItem { cart_id, product_id, quantity: merged })
}

pub fn set_quantity(conn: &Connection, owner_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartItem> {
  let missing = || CoreError::not_found(Entity::CartItem, product_id);
  let cart_id = cart_id(conn, owner_id)?.ok_or_else(missing)?;
  current_quantity(conn, cart_id, product_id)?.ok_or_else(missing)?;
  write_quantity(conn, cart_id, product_id, quantity)?;
  Ok(CartItem { cart_id, product_id, quantity })
}

pub fn remove(conn: &Connection, owner_id: Uuid, product_id: Uuid) -> Result<()> {
  let missing = || CoreError::not_found(Entity::CartItem, product_id);
  let cart_id = cart_id(conn, owner_id)?.ok_or_else(missing)?;
  let changed = conn.execute(
    "DELETE FROM cart_items WHERE cart_id = ?1 AND product_id = ?2",
    params![encode_uuid(cart_id), encode_uuid(product_id)],
  )?;
  if changed == 0 {
    return Err(missing().into());
  }
  Ok(())
}

pub fn view(conn: &Connection, owner_id: Uuid) -> Result<CartView> {
  let Some(cart_id) = cart_id(conn, owner_id)? else {
    return Ok(CartView::assemble(owner_id, None, Vec::new())?);
  };
  Ok(CartView::assemble(owner_id, Some(cart_id), lines(conn, cart_id)?)?)
}

/// Snapshot the owner's cart into a `pending` order and empty the cart.
pub fn place_order(conn: &Connection, owner_id: Uuid) -> Result<OrderView> {
  let rows = match cart_id(conn, owner_id)? {
    Some(cart_id) => lines(conn, cart_id)?,
    None => Vec::new(),
  };
  let draft = cart::draft_order(&rows)?;

  let order = Order {
    order_id:    Uuid::new_v4(),
    owner_id,
    status:      OrderStatus::Pending,
    total_price: draft.total_price,
    created_at:  Utc::now(),
  };
  conn.execute(
    "INSERT INTO orders (order_id, owner_id, status, total_price, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(order.order_id),
      encode_uuid(owner_id),
      encode_enum(order.status),
      encode_money(order.total_price),
      encode_dt(order.created_at),
    ],
  )?;

  let mut stmt = conn.prepare(
    "INSERT INTO order_items (order_id, line_no, product_id, product_name, quantity, unit_price)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  let mut items = Vec::with_capacity(draft.lines.len());
  for (line_no, line) in draft.lines.into_iter().enumerate() {
    stmt.execute(params![
      encode_uuid(order.order_id),
      line_no as i64,
      encode_uuid(line.product_id),
      line.product_name,
      i64::from(line.quantity),
      encode_money(line.unit_price),
    ])?;
    items.push(OrderItem {
      order_id:     order.order_id,
      product_id:   line.product_id,
      product_name: line.product_name,
      quantity:     line.quantity,
      unit_price:   line.unit_price,
    });
  }

  conn.execute(
    "DELETE FROM cart_items WHERE cart_id IN (SELECT cart_id FROM carts WHERE owner_id = ?1)",
    params![encode_uuid(owner_id)],
  )?;

  Ok(OrderView::assemble(order, items, Vec::new()))
}
