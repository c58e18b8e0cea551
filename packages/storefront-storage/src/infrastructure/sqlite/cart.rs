use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{
    exists, line_from_row, load_order, order_from_row, product_from_row, SqliteStorefrontStore,
    LINE_COLUMNS, ORDER_COLUMNS, PRODUCT_COLUMNS,
};
use crate::domain::{
    CartAction, CartLine, CartStore, CartSummary, LineAdjustment, Order, OrderState,
};
use crate::{Result, StorageError};

#[async_trait]
impl CartStore for SqliteStorefrontStore {
    async fn current_order(&self, customer_id: i64) -> Result<Order> {
        let conn = self.conn.lock();
        if !exists(&conn, "customers", customer_id)? {
            return Err(StorageError::not_found("Customer", customer_id));
        }

        let sql = format!(
            "SELECT {} FROM orders o WHERE o.customer_id = ?1 AND o.status != 'paid'
             ORDER BY o.id DESC LIMIT 1",
            ORDER_COLUMNS
        );
        if let Some(order) = conn
            .query_row(&sql, params![customer_id], order_from_row)
            .optional()?
        {
            return Ok(order);
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO orders (customer_id, status, shipping, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)",
            params![customer_id, OrderState::Open.state_name(), now],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Opened order {} for customer {}", id, customer_id);

        Ok(Order {
            id,
            customer_id,
            state: OrderState::Open,
            shipping: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn cart_summary(&self, order_id: i64) -> Result<CartSummary> {
        let conn = self.conn.lock();
        let order = load_order(&conn, order_id)?;

        let sql = format!(
            "SELECT {}, {} FROM order_lines l JOIN products p ON p.id = l.product_id
             WHERE l.order_id = ?1 ORDER BY l.id",
            LINE_COLUMNS, PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map(params![order_id], |row| {
                Ok(CartLine::new(line_from_row(row)?, product_from_row(row, 5)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CartSummary::new(order, lines))
    }

    async fn apply_cart_action(
        &self,
        order_id: i64,
        product_id: i64,
        action: CartAction,
    ) -> Result<LineAdjustment> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        ensure_open(&tx, order_id)?;

        let stock: i64 = tx
            .query_row(
                "SELECT quantity FROM products WHERE id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("Product", product_id))?;

        let line: Option<(i64, i64)> = tx
            .query_row(
                "SELECT id, quantity FROM order_lines WHERE order_id = ?1 AND product_id = ?2",
                params![order_id, product_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let current = line.map(|(_, quantity)| quantity).unwrap_or(0);
        let adjustment = action.apply(current, stock);

        tx.execute(
            "UPDATE products SET quantity = ?1 WHERE id = ?2",
            params![adjustment.stock, product_id],
        )?;

        match (line, adjustment.keeps_line()) {
            (Some((line_id, _)), true) => {
                tx.execute(
                    "UPDATE order_lines SET quantity = ?1 WHERE id = ?2",
                    params![adjustment.line_quantity, line_id],
                )?;
            }
            (Some((line_id, _)), false) => {
                tx.execute("DELETE FROM order_lines WHERE id = ?1", params![line_id])?;
            }
            (None, true) => {
                tx.execute(
                    "INSERT INTO order_lines (order_id, product_id, quantity, added_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![order_id, product_id, adjustment.line_quantity, Utc::now()],
                )?;
            }
            (None, false) => {}
        }

        tx.commit()
            .map_err(|e| StorageError::transaction(format!("Cart update failed: {}", e)).with_source(e))?;

        debug!(
            "Order {}: {} product {} -> line {}, stock {}",
            order_id, action, product_id, adjustment.line_quantity, adjustment.stock
        );
        Ok(adjustment)
    }

    async fn clear_cart(&self, order_id: i64) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        ensure_open(&tx, order_id)?;

        tx.execute(
            "UPDATE products SET quantity = quantity + (
                 SELECT l.quantity FROM order_lines l
                 WHERE l.order_id = ?1 AND l.product_id = products.id
             )
             WHERE id IN (SELECT product_id FROM order_lines WHERE order_id = ?1)",
            params![order_id],
        )?;
        let removed = tx.execute("DELETE FROM order_lines WHERE order_id = ?1", params![order_id])?;

        tx.commit()
            .map_err(|e| StorageError::transaction(format!("Cart clear failed: {}", e)).with_source(e))?;

        debug!("Order {}: cleared {} lines", order_id, removed);
        Ok(())
    }
}

/// Lines of a non-open order are frozen
fn ensure_open(conn: &Connection, order_id: i64) -> Result<()> {
    let order = load_order(conn, order_id)?;
    if !order.is_editable() {
        return Err(StorageError::conflict(format!(
            "Order {} is {}, cart is locked",
            order_id,
            order.state.state_name()
        )));
    }
    Ok(())
}
