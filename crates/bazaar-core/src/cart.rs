//! Carts and the cart → order snapshot arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::Product, money};

/// One line in an owner's cart. `(cart_id, product_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
  pub cart_id:    Uuid,
  pub product_id: Uuid,
  pub quantity:   u32,
}

/// A cart line priced at the current catalog price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
  pub product_id:   Uuid,
  pub quantity:     u32,
  /// `None` when the product has been retired from the catalog.
  pub product_name: Option<String>,
  pub unit_price:   Option<Decimal>,
  pub line_total:   Option<Decimal>,
}

impl CartLine {
  pub fn is_available(&self) -> bool { self.unit_price.is_some() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
  pub owner_id: Uuid,
  /// `None` until the owner first adds something.
  pub cart_id:  Option<Uuid>,
  pub lines:    Vec<CartLine>,
  /// Sum over available lines only.
  pub subtotal: Decimal,
}

impl CartView {
  pub fn assemble(
    owner_id: Uuid,
    cart_id: Option<Uuid>,
    rows: Vec<(CartItem, Option<Product>)>,
  ) -> Result<Self> {
    let lines = rows
      .into_iter()
      .map(|(item, product)| {
        let line_total = product
          .as_ref()
          .map(|p| money::line_total(p.price, item.quantity))
          .transpose()?;
        Ok(CartLine {
          product_id: item.product_id,
          quantity: item.quantity,
          line_total,
          unit_price: product.as_ref().map(|p| p.price),
          product_name: product.map(|p| p.name),
        })
      })
      .collect::<Result<Vec<_>>>()?;
    let subtotal = money::checked_sum(lines.iter().filter_map(|l| l.line_total))?;
    Ok(Self { owner_id, cart_id, lines, subtotal })
  }

  pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

/// Validate a requested line quantity.
pub fn checked_quantity(quantity: i64) -> Result<u32> {
  u32::try_from(quantity)
    .ok()
    .filter(|q| *q >= 1)
    .ok_or(Error::InvalidQuantity(quantity))
}

/// One order line computed from a cart line at placement time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
  pub product_id:   Uuid,
  pub product_name: String,
  pub quantity:     u32,
  pub unit_price:   Decimal,
}

/// The order a cart would become if placed now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
  pub lines:       Vec<DraftLine>,
  /// Exactly `Σ quantity × unit_price` over `lines`.
  pub total_price: Decimal,
}

/// Snapshot each cart line at the product's current price.
///
/// Fails with [`Error::EmptyCart`] when there are no lines, with
/// [`Error::ProductUnavailable`] for the first line whose product is gone,
/// and with [`Error::AmountOutOfRange`] when a line or the total is too
/// large to carry. No partial draft is ever produced.
pub fn draft_order(rows: &[(CartItem, Option<Product>)]) -> Result<OrderDraft> {
  if rows.is_empty() {
    return Err(Error::EmptyCart);
  }

  let mut lines = Vec::with_capacity(rows.len());
  let mut total = Decimal::ZERO;
  for (item, product) in rows {
    let product = product
      .as_ref()
      .ok_or(Error::ProductUnavailable(item.product_id))?;
    let line_total = money::line_total(product.price, item.quantity)?;
    total = money::checked(
      total
        .checked_add(line_total)
        .ok_or(Error::AmountOutOfRange(line_total))?,
    )?;
    lines.push(DraftLine {
      product_id:   product.product_id,
      product_name: product.name.clone(),
      quantity:     item.quantity,
      unit_price:   product.price,
    });
  }

  Ok(OrderDraft { lines, total_price: total })
}
