//! Item entity - the sole persisted record type.

use serde::{Deserialize, Serialize};

/// An inventory record.
///
/// `id` stays `None` until the row has been persisted; the storage engine
/// assigns the next unused integer on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Primary key, assigned by the engine when absent
    pub id: Option<i64>,
    /// Display name; must be non-blank at the validation boundary
    pub name: String,
    /// Unit price in dollars
    pub price: f64,
    /// Units currently in stock; the sell path never takes this below zero
    pub quantity: i64,
}

impl Item {
    /// Create a new, not-yet-persisted item
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Set an explicit primary key (for update/delete construction)
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Copy of this item with the stock count replaced
    pub fn with_quantity(&self, quantity: i64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Render the price as a currency string for display
    pub fn formatted_price(&self) -> String {
        format_price(self.price)
    }
}

/// Format a price as dollars with two decimals and digit grouping,
/// e.g. `1234.5` becomes `$1,234.50`.
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as i64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in dollars.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();

    let sign = if price < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_has_no_id() {
        let item = Item::new("Widget", 1.5, 3);
        assert_eq!(item.id, None);
        assert_eq!(item.name, "Widget");
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_with_quantity_overrides_only_stock() {
        let item = Item::new("Widget", 1.5, 3).with_id(7);
        let sold = item.with_quantity(2);
        assert_eq!(sold.id, Some(7));
        assert_eq!(sold.name, "Widget");
        assert_eq!(sold.quantity, 2);
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1.5), "$1.50");
        assert_eq!(format_price(0.0), "$0.00");
        assert_eq!(format_price(1234.567), "$1,234.57");
        assert_eq!(format_price(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_price(-0.5), "-$0.50");
    }
}
