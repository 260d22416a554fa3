//! SQLite storage engine for inventory items

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crossbeam::channel::{unbounded, Receiver, Sender};
use rusqlite::{params, Connection, OptionalExtension};

use crate::item::Item;
use crate::{Error, Result};

use super::schema;

/// Live stream of the full table; each emission is a complete snapshot
/// ordered by id.
pub type ItemsWatch = Receiver<Vec<Item>>;

/// Live stream of a single row; emits `None` while no row matches the id.
pub type ItemWatch = Receiver<Option<Item>>;

/// Subscriptions registered against the store. Senders whose receiver has
/// been dropped are pruned during notification; a detached subscriber has
/// to call `watch_*` again for a fresh stream.
#[derive(Default)]
struct Watchers {
    all: Vec<Sender<Vec<Item>>>,
    by_id: Vec<(i64, Sender<Option<Item>>)>,
}

/// SQLite-backed storage for inventory items.
///
/// All mutations take the connection lock, so they serialize against each
/// other and against query re-evaluation: subscribers receive the fresh
/// result of every row-changing mutation before that mutation returns.
pub struct InventoryStore {
    conn: Mutex<Connection>,
    watchers: Mutex<Watchers>,
}

impl InventoryStore {
    /// Open a database file (creates if it doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(Watchers::default()),
        })
    }

    /// Initialize the database schema.
    ///
    /// A `user_version` that doesn't match [`schema::SCHEMA_VERSION`] is
    /// resolved by dropping and recreating the store empty, not by
    /// migrating.
    fn initialize_schema(conn: &Connection) -> Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version != schema::SCHEMA_VERSION {
            if version != 0 {
                tracing::warn!(
                    "schema version {} != expected {}, rebuilding store from empty",
                    version,
                    schema::SCHEMA_VERSION
                );
            }
            for stmt in schema::DROP_STATEMENTS {
                conn.execute(stmt, [])?;
            }
            conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        }
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>> {
        mutex.lock().map_err(|_| Error::LockPoisoned)
    }

    // ========== Mutations ==========

    /// Persist a new row.
    ///
    /// An item without an id receives the next unused integer. An item
    /// whose explicit id already exists is left untouched and the call
    /// reports success (don't-clobber policy, not an upsert).
    pub fn insert(&self, item: &Item) -> Result<()> {
        let conn = Self::lock(&self.conn)?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO items (id, name, price, quantity) VALUES (?1, ?2, ?3, ?4)",
            params![item.id, item.name, item.price, item.quantity],
        )?;
        if changed > 0 {
            self.notify_watchers(&conn)?;
        }
        Ok(())
    }

    /// Replace the row matching `item.id` with the given field values.
    /// No-op if no row matches.
    pub fn update(&self, item: &Item) -> Result<()> {
        let conn = Self::lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE items SET name = ?2, price = ?3, quantity = ?4 WHERE id = ?1",
            params![item.id, item.name, item.price, item.quantity],
        )?;
        if changed > 0 {
            self.notify_watchers(&conn)?;
        }
        Ok(())
    }

    /// Remove the row matching `item.id`. No-op if no row matches.
    pub fn delete(&self, item: &Item) -> Result<()> {
        let conn = Self::lock(&self.conn)?;
        let changed = conn.execute("DELETE FROM items WHERE id = ?1", params![item.id])?;
        if changed > 0 {
            self.notify_watchers(&conn)?;
        }
        Ok(())
    }

    // ========== Live queries ==========

    /// Subscribe to the full table. The current snapshot is delivered
    /// immediately; a fresh snapshot follows every row-changing mutation.
    pub fn watch_items(&self) -> Result<ItemsWatch> {
        // Holding the connection lock across snapshot + registration keeps
        // a concurrent mutation from slipping between the two.
        let conn = Self::lock(&self.conn)?;
        let (tx, rx) = unbounded();
        tx.send(Self::query_all(&conn)?).ok();
        Self::lock(&self.watchers)?.all.push(tx);
        Ok(rx)
    }

    /// Subscribe to the row with the given id. Emits `None` while the row
    /// is absent, then tracks it through inserts, updates and deletes.
    pub fn watch_item(&self, id: i64) -> Result<ItemWatch> {
        let conn = Self::lock(&self.conn)?;
        let (tx, rx) = unbounded();
        tx.send(Self::query_item(&conn, id)?).ok();
        Self::lock(&self.watchers)?.by_id.push((id, tx));
        Ok(rx)
    }

    /// Re-run every subscribed query against the current table state and
    /// deliver the results. Called with the connection lock held, before
    /// the triggering mutation returns.
    fn notify_watchers(&self, conn: &Connection) -> Result<()> {
        let mut watchers = Self::lock(&self.watchers)?;

        if !watchers.all.is_empty() {
            let snapshot = Self::query_all(conn)?;
            watchers.all.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }

        let mut i = 0;
        while i < watchers.by_id.len() {
            let (id, tx) = &watchers.by_id[i];
            let row = Self::query_item(conn, *id)?;
            if tx.send(row).is_ok() {
                i += 1;
            } else {
                watchers.by_id.swap_remove(i);
            }
        }
        Ok(())
    }

    fn query_all(conn: &Connection) -> Result<Vec<Item>> {
        let mut stmt = conn.prepare("SELECT id, name, price, quantity FROM items ORDER BY id")?;
        let items = stmt
            .query_map([], Self::row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn query_item(conn: &Connection, id: i64) -> Result<Option<Item>> {
        conn.query_row(
            "SELECT id, name, price, quantity FROM items WHERE id = ?1",
            [id],
            Self::row_to_item,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Helper to convert a row to an Item
    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            price: row.get(2)?,
            quantity: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_item(name: &str, quantity: i64) -> Item {
        Item::new(name, 1.5, quantity)
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let store = InventoryStore::open_in_memory().unwrap();

        store.insert(&sample_item("Widget", 3)).unwrap();
        store.insert(&sample_item("Gadget", 5)).unwrap();

        let watch = store.watch_items().unwrap();
        let items = watch.recv().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, Some(1));
        assert_eq!(items[1].id, Some(2));
    }

    #[test]
    fn test_ids_stay_monotonic_after_delete() {
        let store = InventoryStore::open_in_memory().unwrap();

        store.insert(&sample_item("a", 1)).unwrap();
        store.insert(&sample_item("b", 1)).unwrap();
        store.delete(&sample_item("b", 1).with_id(2)).unwrap();
        store.insert(&sample_item("c", 1)).unwrap();

        let items = store.watch_items().unwrap().recv().unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_insert_duplicate_id_is_ignored() {
        let store = InventoryStore::open_in_memory().unwrap();

        store.insert(&sample_item("original", 3).with_id(7)).unwrap();
        store.insert(&sample_item("impostor", 9).with_id(7)).unwrap();

        let row = store.watch_item(7).unwrap().recv().unwrap().unwrap();
        assert_eq!(row.name, "original");
        assert_eq!(row.quantity, 3);
    }

    #[test]
    fn test_update_replaces_row() {
        let store = InventoryStore::open_in_memory().unwrap();

        store.insert(&sample_item("Widget", 3)).unwrap();
        store
            .update(&Item::new("Widget Pro", 2.5, 4).with_id(1))
            .unwrap();

        let row = store.watch_item(1).unwrap().recv().unwrap().unwrap();
        assert_eq!(row.name, "Widget Pro");
        assert_eq!(row.price, 2.5);
        assert_eq!(row.quantity, 4);
    }

    #[test]
    fn test_update_and_delete_missing_are_noops() {
        let store = InventoryStore::open_in_memory().unwrap();
        store.insert(&sample_item("Widget", 3)).unwrap();

        let watch = store.watch_items().unwrap();
        watch.recv().unwrap();

        store.update(&sample_item("ghost", 1).with_id(42)).unwrap();
        store.delete(&sample_item("ghost", 1).with_id(42)).unwrap();
        // An id-less update matches nothing as well
        store.update(&sample_item("ghost", 1)).unwrap();

        // No rows changed, so nothing was emitted
        assert!(watch.try_recv().is_err());
        let items = InventoryStore::query_all(&store.conn.lock().unwrap()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Widget");
    }

    #[test]
    fn test_mutation_notifies_before_returning() {
        let store = InventoryStore::open_in_memory().unwrap();

        let watch = store.watch_items().unwrap();
        assert!(watch.recv().unwrap().is_empty());

        store.insert(&sample_item("Widget", 3)).unwrap();
        // The snapshot must already be queued once insert has returned
        let items = watch.try_recv().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Widget");
    }

    #[test]
    fn test_watch_item_tracks_row_lifecycle() {
        let store = InventoryStore::open_in_memory().unwrap();
        let watch = store.watch_item(1).unwrap();

        assert_eq!(watch.recv().unwrap(), None);

        store.insert(&sample_item("Widget", 3)).unwrap();
        let row = watch.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(row.quantity, 3);

        store.update(&row.with_quantity(2)).unwrap();
        let row = watch.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(row.quantity, 2);

        store.delete(&row).unwrap();
        assert_eq!(watch.recv_timeout(Duration::from_secs(1)).unwrap(), None);
    }

    #[test]
    fn test_detached_watchers_are_pruned() {
        let store = InventoryStore::open_in_memory().unwrap();

        let kept = store.watch_items().unwrap();
        let dropped = store.watch_items().unwrap();
        drop(dropped);

        store.insert(&sample_item("Widget", 3)).unwrap();

        assert_eq!(store.watchers.lock().unwrap().all.len(), 1);
        kept.recv().unwrap();
        assert_eq!(kept.recv().unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_keeps_data_when_version_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        {
            let store = InventoryStore::open(&path).unwrap();
            store.insert(&sample_item("Widget", 3)).unwrap();
        }

        let store = InventoryStore::open(&path).unwrap();
        let items = store.watch_items().unwrap().recv().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Widget");
    }

    #[test]
    fn test_version_mismatch_rebuilds_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        {
            // A pre-versioned layout: user_version still 0
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)", [])
                .unwrap();
            conn.execute("INSERT INTO items (label) VALUES ('stale')", [])
                .unwrap();
        }

        let store = InventoryStore::open(&path).unwrap();
        let items = store.watch_items().unwrap().recv().unwrap();
        assert!(items.is_empty());
        store.insert(&sample_item("fresh", 1)).unwrap();
    }
}
