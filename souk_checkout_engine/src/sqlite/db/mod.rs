//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! All of these are plain functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an
//! atomic transaction as the need arises and call through to the functions without any other
//! changes.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod carts;
pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod payments;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
