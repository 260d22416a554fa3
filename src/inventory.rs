//! Inventory mediation - validation and mutation dispatch.
//!
//! `Inventory` is the one surface a presentation layer talks to. It parses
//! and validates user input, hands mutations to a background worker so the
//! calling thread never blocks on storage I/O, and passes live query
//! subscriptions through from the engine.

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{unbounded, Sender};

use crate::item::Item;
use crate::storage::{InventoryStore, ItemWatch, ItemsWatch};
use crate::{Error, Result};

enum Mutation {
    Insert(Item),
    Update(Item),
    Delete(Item),
}

/// Mediator between a presentation layer and the storage engine.
///
/// Mutations are fire-and-forget: dispatch enqueues and returns
/// immediately, a dedicated worker applies them in issue order, and
/// storage failures surface asynchronously through the error log. Parse
/// and validation failures are returned synchronously and block dispatch
/// entirely.
pub struct Inventory {
    store: Arc<InventoryStore>,
    tx: Option<Sender<Mutation>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Inventory {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        let (tx, rx) = unbounded::<Mutation>();

        let worker_store = store.clone();
        let worker = thread::spawn(move || {
            for mutation in rx {
                let result = match &mutation {
                    Mutation::Insert(item) => worker_store.insert(item),
                    Mutation::Update(item) => worker_store.update(item),
                    Mutation::Delete(item) => worker_store.delete(item),
                };
                if let Err(e) = result {
                    tracing::error!("inventory mutation failed: {}", e);
                }
            }
        });

        Self {
            store,
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    fn dispatch(&self, mutation: Mutation) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::DispatcherStopped)?;
        tx.send(mutation).map_err(|_| Error::DispatcherStopped)
    }

    // ========== Mutations ==========

    /// Parse the given field texts and enqueue an insert of a new item.
    /// The engine assigns the id. Parse failure is returned and nothing
    /// is dispatched.
    pub fn add_new_item(&self, name: &str, price_text: &str, count_text: &str) -> Result<()> {
        let item = Item::new(name, parse_price(price_text)?, parse_count(count_text)?);
        self.dispatch(Mutation::Insert(item))
    }

    /// Parse the given field texts and enqueue a full-row update of the
    /// item with the given id.
    pub fn update_item(
        &self,
        id: i64,
        name: &str,
        price_text: &str,
        count_text: &str,
    ) -> Result<()> {
        let item =
            Item::new(name, parse_price(price_text)?, parse_count(count_text)?).with_id(id);
        self.dispatch(Mutation::Update(item))
    }

    /// Sell one unit: enqueue an update with the stock count decremented
    /// by exactly one. No-op when the given snapshot shows no stock, so
    /// the count never goes negative. Callers must pass a current
    /// snapshot; the quantity is not re-fetched.
    pub fn sell_item(&self, item: &Item) -> Result<()> {
        if item.quantity > 0 {
            self.dispatch(Mutation::Update(item.with_quantity(item.quantity - 1)))
        } else {
            Ok(())
        }
    }

    /// Enqueue removal of the given item (matched by id).
    pub fn delete_item(&self, item: &Item) -> Result<()> {
        self.dispatch(Mutation::Delete(item.clone()))
    }

    // ========== Queries ==========

    /// Live single-item stream from the engine, unmodified pass-through.
    pub fn retrieve_item(&self, id: i64) -> Result<ItemWatch> {
        self.store.watch_item(id)
    }

    /// Live full-table stream from the engine, unmodified pass-through.
    pub fn all_items(&self) -> Result<ItemsWatch> {
        self.store.watch_items()
    }

    // ========== Validation ==========

    /// True iff none of the three entry fields is blank after trimming.
    /// Numeric parseability is checked separately at dispatch time.
    pub fn is_entry_valid(&self, name: &str, price_text: &str, count_text: &str) -> bool {
        !(name.trim().is_empty() || price_text.trim().is_empty() || count_text.trim().is_empty())
    }

    /// True iff the item has stock left to sell.
    pub fn is_stock_available(&self, item: &Item) -> bool {
        item.quantity > 0
    }
}

impl Drop for Inventory {
    /// Close the queue, then wait for already-accepted mutations to land.
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

fn parse_price(text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidPrice(text.to_string()))
}

fn parse_count(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidQuantity(text.to_string()))
}
