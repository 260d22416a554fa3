//! Process-wide access to the one storage engine instance.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use crate::{Error, Result};

use super::sqlite::InventoryStore;

static STORE: OnceLock<Arc<InventoryStore>> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Get the shared storage engine, opening the backing database at
/// `location` on first use.
///
/// The first caller constructs the engine; every later caller, from any
/// thread, receives the same instance and its `location` argument is
/// ignored. Double-checked: the fast path reads the published handle
/// without locking, the slow path takes the init lock and re-checks before
/// constructing, so concurrent first callers trigger at most one
/// construction and never see a partially built engine.
pub fn get_store(location: &Path) -> Result<Arc<InventoryStore>> {
    if let Some(store) = STORE.get() {
        return Ok(store.clone());
    }

    let _guard = INIT.lock().map_err(|_| Error::LockPoisoned)?;
    if let Some(store) = STORE.get() {
        return Ok(store.clone());
    }

    tracing::info!("opening inventory database at {}", location.display());
    let store = Arc::new(InventoryStore::open(location)?);
    STORE.set(store.clone()).ok();
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_first_callers_share_one_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || get_store(&path).unwrap())
            })
            .collect();

        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for store in &stores[1..] {
            assert!(Arc::ptr_eq(&stores[0], store));
        }
    }
}
