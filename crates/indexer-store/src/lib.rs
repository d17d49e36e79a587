//! Typed Postgres persistence (spec.md §4.B).
//!
//! [`Store`] owns the connection pool and every read/write query. Amount
//! columns are `TEXT` decimal strings end to end (see
//! `migrations/0001_init.sql`), and balance maintenance is a database
//! trigger rather than application code, so [`Store::insert_token_transfer`]
//! is the only write path that can ever change a balance.

pub mod effects;
pub mod error;
mod rows;
mod store;

pub use effects::{apply_transfer_effects, BalanceKey};
pub use error::StoreError;
pub use store::{
    insert_block, insert_contract, insert_token_transfer, insert_transaction, Store, Tx,
};
