//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with a single table:
//! - items(id, name, price, quantity)
//!
//! Mutations serialize behind one connection lock, and every row-changing
//! mutation re-runs all live query subscriptions before it returns, so a
//! subscriber never holds a snapshot older than the last acknowledged write.

pub mod handle;
pub mod schema;
pub mod sqlite;

pub use handle::get_store;
pub use sqlite::{InventoryStore, ItemWatch, ItemsWatch};
