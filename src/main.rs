//! Stockroom CLI - terminal front end for the inventory store

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockroom::config::{self, StoreConfig};
use stockroom::{storage, Inventory, Item};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version = "0.0.1")]
#[command(about = "Reactive local inventory store")]
#[command(long_about = r#"
Stockroom keeps a single local table of inventory items and pushes fresh
query results to subscribers on every change.

Example usage:
  stockroom add "Widget" 1.50 3
  stockroom list
  stockroom sell 1
  stockroom watch
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides stockroom.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a stockroom.toml pointing at a database location
    Init {
        /// Where the database file should live
        #[arg(short, long)]
        location: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Add a new item
    Add {
        /// Item name
        name: String,
        /// Unit price, e.g. 1.50
        price: String,
        /// Units in stock
        count: String,
    },

    /// Replace every field of an existing item
    Update {
        /// Id of the item to update
        id: i64,
        name: String,
        price: String,
        count: String,
    },

    /// Sell one unit of an item
    Sell {
        /// Id of the item to sell
        id: i64,
    },

    /// Delete an item
    Delete {
        /// Id of the item to delete
        id: i64,
    },

    /// Show a single item
    Show {
        /// Id of the item to show
        id: i64,

        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List all items
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Keep printing the table on every change
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Commands::Init { location, force } = &cli.command {
        let location = location
            .clone()
            .unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
        let config = StoreConfig {
            location: Some(location.display().to_string()),
        };
        config::write_config(&config::default_config_path(), &config, *force)?;
        println!("Wrote {} ({})", config::default_config_path().display(), location.display());
        return Ok(());
    }

    let database = resolve_database(cli.database)?;
    let store = storage::get_store(&database)?;
    let inventory = Inventory::new(store);

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Add { name, price, count } => {
            if !inventory.is_entry_valid(&name, &price, &count) {
                anyhow::bail!("name, price and count must not be blank");
            }
            inventory.add_new_item(&name, &price, &count)?;
            println!("{} {}", "Added".green(), name);
        }

        Commands::Update { id, name, price, count } => {
            if !inventory.is_entry_valid(&name, &price, &count) {
                anyhow::bail!("name, price and count must not be blank");
            }
            inventory.update_item(id, &name, &price, &count)?;
            println!("{} item {}", "Updated".green(), id);
        }

        Commands::Sell { id } => {
            let Some(item) = fetch_item(&inventory, id)? else {
                anyhow::bail!("no item with id {}", id);
            };
            if !inventory.is_stock_available(&item) {
                println!("{} is {}", item.name, "out of stock".red());
            } else {
                inventory.sell_item(&item)?;
                println!(
                    "Sold one {} at {} ({} left)",
                    item.name,
                    item.formatted_price(),
                    item.quantity - 1
                );
            }
        }

        Commands::Delete { id } => {
            let Some(item) = fetch_item(&inventory, id)? else {
                anyhow::bail!("no item with id {}", id);
            };
            inventory.delete_item(&item)?;
            println!("{} {}", "Deleted".green(), item.name);
        }

        Commands::Show { id, json } => {
            let Some(item) = fetch_item(&inventory, id)? else {
                anyhow::bail!("no item with id {}", id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!("{}", items_table(std::slice::from_ref(&item)));
            }
        }

        Commands::List { json } => {
            let watch = inventory.all_items()?;
            let items = watch.recv()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("{}", items_table(&items));
            }
        }

        Commands::Watch => {
            let watch = inventory.all_items()?;
            println!("Watching inventory, reprinting on every change (ctrl-c to stop)");
            for items in watch {
                println!("{}", items_table(&items));
            }
        }
    }

    // Dropping the mediator here flushes the mutation queue before exit.
    Ok(())
}

/// CLI flag wins, then stockroom.toml, then the default location.
fn resolve_database(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let path = match flag {
        Some(path) => path,
        None => match config::load_config(None)? {
            Some(StoreConfig { location: Some(location) }) => PathBuf::from(location),
            _ => config::default_database_path_in(Path::new(".")),
        },
    };
    config::ensure_db_dir(&path)?;
    Ok(path)
}

/// One-shot read: first emission of the single-item live query.
fn fetch_item(inventory: &Inventory, id: i64) -> anyhow::Result<Option<Item>> {
    let watch = inventory.retrieve_item(id)?;
    Ok(watch.recv()?)
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "In Stock")]
    quantity: i64,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.unwrap_or_default(),
            name: item.name.clone(),
            price: item.formatted_price(),
            quantity: item.quantity,
        }
    }
}

fn items_table(items: &[Item]) -> String {
    if items.is_empty() {
        return "(no items)".to_string();
    }
    Table::new(items.iter().map(ItemRow::from))
        .with(Style::rounded())
        .to_string()
}
