//! Synchronous units of work, one per store operation.
//!
//! Each function runs on the connection thread against an already-open
//! transaction (a `&Transaction` derefs to the `&Connection` taken here) and
//! never commits; [`crate::SqliteStore`] commits when the function returns
//! `Ok` and rolls back otherwise.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod discount;
pub mod order;

use rusqlite::{Connection, OptionalExtension as _, Params};

use crate::Result;

/// Run a single-row query, mapping the row through `from_row`.
fn query_one<P, R>(
  conn: &Connection,
  sql: &str,
  params: P,
  from_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
) -> Result<Option<R>>
where
  P: Params,
{
  Ok(conn.query_row(sql, params, from_row).optional()?)
}

/// Run a multi-row query, mapping each row through `from_row`.
fn query_all<P, R>(
  conn: &Connection,
  sql: &str,
  params: P,
  from_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
) -> Result<Vec<R>>
where
  P: Params,
{
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}
