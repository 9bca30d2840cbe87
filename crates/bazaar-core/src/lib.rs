//! Core types, rules and trait definitions for the Bazaar commerce core.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! rule functions here decide; a [`store::CommerceStore`] backend applies
//! those decisions inside its own transactions.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod address;
pub mod cart;
pub mod catalog;
pub mod discount;
pub mod error;
pub mod events;
pub mod ledger;
pub mod money;
pub mod order;
pub mod service;
pub mod store;

pub use actor::Actor;
pub use error::{Entity, Error, Result};
pub use service::Commerce;
