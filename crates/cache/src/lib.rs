//! Offline content cache.
//!
//! Content fetched from the sync API is cached in one SQLite database per
//! signed-in identity, so that it can be shown without a network round trip.
//! The database is not the source of truth - the server is. Any file that
//! cannot be opened is simply deleted and recreated empty.
//!
//! # Architecture
//! - [`Namespace`] turns the current identity into the `user_<id>` file name
//!   prefix, and [`Location`] places that file on disk.
//! - [`Store`] is the only way in: a handle to a single worker that owns the
//!   database and runs every operation, one at a time, in issue order.
//! - [`Store::create_or_update`] merges a whole [`CacheRequest`] in one
//!   transaction and then advances the sync watermark, which the sync layer
//!   reads back through [`Store::last_fetched_at`] to decide what to fetch.
//!
//! [`CacheRequest`]: feedstash_models::CacheRequest

mod db;
pub mod error;
mod identity;
mod location;
mod models;
mod repo;
pub mod reset;
mod store;

pub use crate::db::Database;
pub use crate::identity::{ANONYMOUS, FixedIdentity, IdentityHandle, IdentityProvider, Namespace};
pub use crate::location::Location;
pub use crate::repo::{CONTENT_WATERMARK, Counts, Repository};
pub use crate::store::{Pending, Store};
