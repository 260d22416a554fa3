//! # Stockroom - Reactive Local Inventory Store
//!
//! Single-table local persistence for inventory records with live queries.
//!
//! Stockroom provides:
//! - A persisted `Item` entity keyed by an auto-assigned integer id
//! - SQLite-backed storage where every mutation pushes fresh results to all
//!   subscribed queries before it returns
//! - A process-wide, lazily-constructed storage engine handle
//! - An `Inventory` mediator that validates input and dispatches mutations
//!   off the calling thread

pub mod config;
pub mod inventory;
pub mod item;
pub mod storage;

// Re-exports for convenient access
pub use inventory::Inventory;
pub use item::Item;
pub use storage::{InventoryStore, ItemWatch, ItemsWatch};

/// Result type alias for Stockroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stockroom operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage engine lock poisoned")]
    LockPoisoned,

    #[error("Mutation dispatcher is no longer running")]
    DispatcherStopped,
}
