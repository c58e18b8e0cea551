//! SQLite adapter for the storefront ports
//!
//! One connection behind a mutex. Multi-statement updates (cart lines
//! against product stock) run in a SQLite transaction while the lock is
//! held, so concurrent handlers never observe a half-applied cart change.

mod accounts;
mod cart;
mod catalog;
mod checkout;
mod schema;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{Category, Customer, Money, Order, OrderLine, OrderState, Product, User};
use crate::{ErrorKind, Result, StorageError};

/// SQLite-backed [`StorefrontStore`](crate::domain::StorefrontStore)
#[derive(Clone)]
pub struct SqliteStorefrontStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorefrontStore {
    /// Open (or create) a database file
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        debug!("Opening SQLite database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Row mapping
// ═══════════════════════════════════════════════════════════════════════════

pub(super) const CATEGORY_COLUMNS: &str = "c.id, c.name, c.image, c.slug, c.parent_id";

pub(super) const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.price_minor, \
     p.created_at, p.watched, p.quantity, p.description, p.info, p.size, p.color";

pub(super) const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.status, o.payment_session_id, \
     o.payment_started_at, o.paid_at, o.shipping, o.created_at, o.updated_at";

pub(super) const LINE_COLUMNS: &str = "l.id, l.order_id, l.product_id, l.quantity, l.added_at";

pub(super) const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.salt, u.created_at";

pub(super) const CUSTOMER_COLUMNS: &str =
    "cu.id, cu.user_id, cu.first_name, cu.last_name, cu.email, cu.phone";

pub(super) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        slug: row.get(3)?,
        parent_id: row.get(4)?,
    })
}

/// Product columns starting at `offset` (joined queries put other columns first)
pub(super) fn product_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(offset)?,
        category_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        slug: row.get(offset + 3)?,
        price: Money::from_minor(row.get(offset + 4)?),
        created_at: row.get(offset + 5)?,
        watched: row.get(offset + 6)?,
        quantity: row.get(offset + 7)?,
        description: row.get(offset + 8)?,
        info: row.get(offset + 9)?,
        size: row.get(offset + 10)?,
        color: row.get(offset + 11)?,
    })
}

pub(super) fn line_from_row(row: &Row<'_>) -> rusqlite::Result<OrderLine> {
    Ok(OrderLine {
        id: row.get(0)?,
        order_id: row.get(1)?,
        product_id: row.get(2)?,
        quantity: row.get(3)?,
        added_at: row.get(4)?,
    })
}

pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        salt: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(super) fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
    })
}

pub(super) fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(2)?;
    let state = decode_order_state(&status, row.get(3)?, row.get(4)?, row.get(5)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Order {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        state,
        shipping: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn decode_order_state(
    status: &str,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
) -> Result<OrderState> {
    let missing = |column: &str| {
        StorageError::new(
            ErrorKind::Serialization,
            format!("Order in state '{}' has no {}", status, column),
        )
    };

    match status {
        "open" => Ok(OrderState::Open),
        "awaiting_payment" => Ok(OrderState::AwaitingPayment {
            session_id: session_id.ok_or_else(|| missing("payment_session_id"))?,
            started_at: started_at.ok_or_else(|| missing("payment_started_at"))?,
        }),
        "paid" => Ok(OrderState::Paid {
            session_id: session_id.ok_or_else(|| missing("payment_session_id"))?,
            paid_at: paid_at.ok_or_else(|| missing("paid_at"))?,
        }),
        other => Err(StorageError::serialization(format!(
            "Unknown order status: {}",
            other
        ))),
    }
}

/// (status, payment_session_id, payment_started_at, paid_at)
pub(super) fn encode_order_state(
    state: &OrderState,
) -> (
    &'static str,
    Option<&str>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
) {
    match state {
        OrderState::Open => (state.state_name(), None, None, None),
        OrderState::AwaitingPayment {
            session_id,
            started_at,
        } => (state.state_name(), Some(session_id), Some(*started_at), None),
        OrderState::Paid {
            session_id,
            paid_at,
        } => (state.state_name(), Some(session_id), None, Some(*paid_at)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared lookups (usable inside a transaction)
// ═══════════════════════════════════════════════════════════════════════════

pub(super) fn load_product(conn: &Connection, product_id: i64) -> Result<Product> {
    let sql = format!("SELECT {} FROM products p WHERE p.id = ?1", PRODUCT_COLUMNS);
    conn.query_row(&sql, params![product_id], |row| product_from_row(row, 0))
        .optional()?
        .ok_or_else(|| StorageError::not_found("Product", product_id))
}

pub(super) fn load_order(conn: &Connection, order_id: i64) -> Result<Order> {
    let sql = format!("SELECT {} FROM orders o WHERE o.id = ?1", ORDER_COLUMNS);
    conn.query_row(&sql, params![order_id], order_from_row)
        .optional()?
        .ok_or_else(|| StorageError::not_found("Order", order_id))
}

pub(super) fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

/// Rewrap a uniqueness failure with a readable message
pub(super) fn on_conflict(err: rusqlite::Error, message: impl FnOnce() -> String) -> StorageError {
    let err = StorageError::from(err);
    if err.kind == ErrorKind::Conflict {
        StorageError::conflict(message())
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_schema() {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        let conn = store.conn.lock();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('categories', 'products', 'gallery_images', 'users', 'sessions', 'customers', \
                  'orders', 'order_lines', 'favorites', 'shipping_addresses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 10);

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        assert!(store.init_schema().is_ok());
    }

    #[test]
    fn test_order_state_encoding() {
        let now = Utc::now();
        let state = OrderState::AwaitingPayment {
            session_id: "cs_1".to_string(),
            started_at: now,
        };
        let (status, session, started, paid) = encode_order_state(&state);
        assert_eq!(status, "awaiting_payment");

        let decoded =
            decode_order_state(status, session.map(str::to_string), started, paid).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_decode_rejects_incomplete_rows() {
        assert!(decode_order_state("paid", None, None, None).is_err());
        assert!(decode_order_state("shipped", None, None, None).is_err());
        assert_eq!(
            decode_order_state("open", None, None, None).unwrap(),
            OrderState::Open
        );
    }
}
