//! Cart model and the quantity arithmetic behind it
//!
//! A cart is the customer's current order. Every unit placed in a line is
//! taken out of the product's stock and every unit removed goes back, so
//! `line quantity + stock` never changes across a [`CartAction`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::catalog::{Money, Product};
use super::order::Order;
use crate::{Result, StorageError};

/// Cart line mutation requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    /// One more unit, if any is in stock
    Add,
    /// One less unit
    Delete,
    /// Drop the whole line
    Remove,
}

impl CartAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartAction::Add => "add",
            CartAction::Delete => "delete",
            CartAction::Remove => "remove",
        }
    }

    /// New line quantity and stock after this action
    ///
    /// ```rust
    /// use storefront_storage::domain::CartAction;
    ///
    /// let adj = CartAction::Add.apply(1, 4);
    /// assert_eq!((adj.line_quantity, adj.stock), (2, 3));
    ///
    /// // nothing left to add
    /// let adj = CartAction::Add.apply(1, 0);
    /// assert_eq!((adj.line_quantity, adj.stock), (1, 0));
    /// ```
    pub fn apply(self, line_quantity: i64, stock: i64) -> LineAdjustment {
        let (line_quantity, stock) = match self {
            CartAction::Add if stock > 0 => (line_quantity + 1, stock - 1),
            CartAction::Add => (line_quantity, stock),
            CartAction::Delete if line_quantity > 0 => (line_quantity - 1, stock + 1),
            CartAction::Delete => (line_quantity, stock),
            CartAction::Remove => (0, stock + line_quantity.max(0)),
        };
        LineAdjustment {
            line_quantity,
            stock,
        }
    }
}

impl FromStr for CartAction {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(CartAction::Add),
            "delete" => Ok(CartAction::Delete),
            "remove" => Ok(CartAction::Remove),
            _ => Err(StorageError::validation(format!("Unknown cart action: {}", s))),
        }
    }
}

impl fmt::Display for CartAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of [`CartAction::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdjustment {
    pub line_quantity: i64,
    pub stock: i64,
}

impl LineAdjustment {
    /// Lines that drop below one unit are deleted
    pub fn keeps_line(&self) -> bool {
        self.line_quantity >= 1
    }
}

/// Order line (product + quantity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// Order line joined with its product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub line: OrderLine,
    pub product: Product,
    pub total_price: Money,
}

impl CartLine {
    pub fn new(line: OrderLine, product: Product) -> Self {
        let total_price = product
            .price
            .checked_mul(line.quantity)
            .unwrap_or(Money::from_minor(i64::MAX));
        Self {
            line,
            product,
            total_price,
        }
    }
}

/// Current cart with totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub order: Order,
    pub lines: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_price: Money,
}

impl CartSummary {
    pub fn new(order: Order, lines: Vec<CartLine>) -> Self {
        let total_quantity = lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.line.quantity));
        let total_price = lines.iter().map(|l| l.total_price).sum();
        Self {
            order,
            lines,
            total_quantity,
            total_price,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderState;
    use proptest::prelude::*;

    fn product(id: i64, price: i64) -> Product {
        Product {
            id,
            category_id: 1,
            name: format!("Product {}", id),
            slug: format!("product-{}", id),
            price: Money::from_minor(price),
            created_at: Utc::now(),
            watched: 0,
            quantity: 10,
            description: String::new(),
            info: String::new(),
            size: None,
            color: "Black".to_string(),
        }
    }

    fn line(product_id: i64, quantity: i64) -> OrderLine {
        OrderLine {
            id: product_id,
            order_id: 1,
            product_id,
            quantity,
            added_at: Utc::now(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CartAction Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_action_parse() {
        assert_eq!("add".parse::<CartAction>().unwrap(), CartAction::Add);
        assert_eq!("delete".parse::<CartAction>().unwrap(), CartAction::Delete);
        assert_eq!("remove".parse::<CartAction>().unwrap(), CartAction::Remove);

        let err = "buy".parse::<CartAction>().unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Validation);
    }

    #[test]
    fn test_add_takes_from_stock() {
        let adj = CartAction::Add.apply(0, 3);
        assert_eq!(adj, LineAdjustment { line_quantity: 1, stock: 2 });
        assert!(adj.keeps_line());
    }

    #[test]
    fn test_add_without_stock_is_noop() {
        let adj = CartAction::Add.apply(0, 0);
        assert_eq!(adj, LineAdjustment { line_quantity: 0, stock: 0 });
        assert!(!adj.keeps_line());
    }

    #[test]
    fn test_delete_returns_to_stock() {
        let adj = CartAction::Delete.apply(2, 5);
        assert_eq!(adj, LineAdjustment { line_quantity: 1, stock: 6 });

        let adj = CartAction::Delete.apply(1, 5);
        assert_eq!(adj.line_quantity, 0);
        assert!(!adj.keeps_line());
    }

    #[test]
    fn test_delete_on_empty_line_does_not_create_stock() {
        let adj = CartAction::Delete.apply(0, 5);
        assert_eq!(adj, LineAdjustment { line_quantity: 0, stock: 5 });
    }

    #[test]
    fn test_remove_returns_everything() {
        let adj = CartAction::Remove.apply(4, 1);
        assert_eq!(adj, LineAdjustment { line_quantity: 0, stock: 5 });
    }

    proptest! {
        #[test]
        fn prop_units_are_conserved(
            line in 0i64..1_000,
            stock in 0i64..1_000,
            action in prop_oneof![
                Just(CartAction::Add),
                Just(CartAction::Delete),
                Just(CartAction::Remove),
            ],
        ) {
            let adj = action.apply(line, stock);
            prop_assert_eq!(adj.line_quantity + adj.stock, line + stock);
            prop_assert!(adj.line_quantity >= 0);
            prop_assert!(adj.stock >= 0);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CartSummary Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_summary_totals() {
        let order = Order::new(1, 1, OrderState::Open);
        let lines = vec![
            CartLine::new(line(1, 2), product(1, 1_000)),
            CartLine::new(line(2, 1), product(2, 2_550)),
        ];

        let summary = CartSummary::new(order, lines);
        assert_eq!(summary.total_quantity, 3);
        assert_eq!(summary.total_price, Money::from_minor(4_550));
        assert_eq!(summary.lines[0].total_price, Money::from_minor(2_000));
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_summary_total_saturates() {
        let price = Money::parse("50000000000000000").unwrap().minor_units();
        let lines = vec![
            CartLine::new(line(1, 1), product(1, price)),
            CartLine::new(line(2, 1), product(2, price)),
            CartLine::new(line(3, 3), product(3, i64::MAX / 2)),
        ];

        let summary = CartSummary::new(Order::new(1, 1, OrderState::Open), lines);
        assert_eq!(summary.lines[2].total_price, Money::from_minor(i64::MAX));
        assert_eq!(summary.total_price, Money::from_minor(i64::MAX));
        assert_eq!(summary.total_quantity, 5);
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::new(Order::new(1, 1, OrderState::Open), vec![]);
        assert_eq!(summary.total_quantity, 0);
        assert_eq!(summary.total_price, Money::ZERO);
        assert!(summary.is_empty());
    }
}
