//! Database schema definitions

/// Expected value of `PRAGMA user_version`. Bump when the table layout
/// changes; a mismatch on open drops and recreates the store empty
/// instead of migrating.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL to create the items table.
///
/// AUTOINCREMENT keeps assigned ids strictly increasing for the lifetime
/// of the store, even after deletes.
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price REAL NOT NULL,
    quantity INTEGER NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_items_name ON items(name)",
];

/// Statements for the destructive rebuild on version mismatch
pub const DROP_STATEMENTS: &[&str] = &["DROP TABLE IF EXISTS items"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_ITEMS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
