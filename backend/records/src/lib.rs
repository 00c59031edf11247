//! # Records
//!
//! Persistence for merchants, lotteries, surveys and responses.
//!
//! The tables live in an external hosted store. This crate only knows how to talk to it:
//! [`remote::RestStore`] for the real thing, [`memory::MemoryStore`] for tests and local runs,
//! and [`database::Database`] on top of either one for the typed, retried, paged accessors.
use std::sync::Arc;

pub mod database;
pub mod error;
pub mod memory;
pub mod models;
pub mod remote;
pub mod retry;
pub mod store;

pub use database::{Database, Paging};
pub use error::StoreError;
pub use retry::RetryPolicy;
pub use store::RecordStore;

use remote::RestStore;

pub fn connect_remote(
    store_url: &str,
    store_key: &str,
    retry: RetryPolicy,
    paging: Paging,
) -> Result<Database, StoreError> {
    let store = RestStore::new(store_url, store_key)?;

    Ok(Database::new(Arc::new(store), retry, paging))
}
