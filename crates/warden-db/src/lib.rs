//! Warden Database Layer
//!
//! This crate provides the user persistence layer for Warden: the
//! [`UserStore`] contract the authentication core is written against, and
//! a SQLite implementation of it via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod store;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{Database, StoreTimeouts};
pub use store::{PageRequest, UserStore};
