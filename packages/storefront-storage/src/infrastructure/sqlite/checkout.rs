use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{
    encode_order_state, exists, load_order, order_from_row, SqliteStorefrontStore, ORDER_COLUMNS,
};
use crate::domain::{CheckoutStore, NewShippingAddress, Order, OrderState, ShippingAddress};
use crate::{Result, StorageError};

#[async_trait]
impl CheckoutStore for SqliteStorefrontStore {
    async fn save_shipping_address(
        &self,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress> {
        let conn = self.conn.lock();
        if !exists(&conn, "customers", address.customer_id)? {
            return Err(StorageError::not_found("Customer", address.customer_id));
        }
        let order = load_order(&conn, address.order_id)?;
        if order.customer_id != address.customer_id {
            return Err(StorageError::validation(format!(
                "Order {} does not belong to customer {}",
                order.id, address.customer_id
            )));
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO shipping_addresses (customer_id, order_id, city, state, street, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address.customer_id,
                address.order_id,
                &address.city,
                &address.state,
                &address.street,
                created_at
            ],
        )?;

        Ok(ShippingAddress {
            id: conn.last_insert_rowid(),
            customer_id: address.customer_id,
            order_id: address.order_id,
            city: address.city.clone(),
            state: address.state.clone(),
            street: address.street.clone(),
            created_at,
        })
    }

    async fn shipping_addresses(&self, order_id: i64) -> Result<Vec<ShippingAddress>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, customer_id, order_id, city, state, street, created_at
             FROM shipping_addresses WHERE order_id = ?1 ORDER BY id",
        )?;
        let addresses = stmt
            .query_map(params![order_id], |row| {
                Ok(ShippingAddress {
                    id: row.get(0)?,
                    customer_id: row.get(1)?,
                    order_id: row.get(2)?,
                    city: row.get(3)?,
                    state: row.get(4)?,
                    street: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(addresses)
    }

    async fn save_order_state(&self, order: &Order, expected: &OrderState) -> Result<()> {
        let conn = self.conn.lock();
        let (status, session_id, started_at, paid_at) = encode_order_state(&order.state);

        let updated = conn.execute(
            "UPDATE orders SET status = ?1, payment_session_id = ?2, payment_started_at = ?3,
             paid_at = ?4, shipping = ?5, updated_at = ?6
             WHERE id = ?7 AND status = ?8 AND payment_session_id IS ?9",
            params![
                status,
                session_id,
                started_at,
                paid_at,
                order.shipping,
                Utc::now(),
                order.id,
                expected.state_name(),
                expected.payment_session_id()
            ],
        )?;
        if updated == 0 {
            if !exists(&conn, "orders", order.id)? {
                return Err(StorageError::not_found("Order", order.id));
            }
            let current = load_order(&conn, order.id)?;
            return Err(StorageError::conflict(format!(
                "Order {} is {}, expected {}",
                order.id,
                current.state.state_name(),
                expected.state_name()
            )));
        }

        debug!("Order {} is now {}", order.id, status);
        Ok(())
    }

    async fn order(&self, order_id: i64) -> Result<Order> {
        let conn = self.conn.lock();
        load_order(&conn, order_id)
    }

    async fn order_by_payment_session(&self, session_id: &str) -> Result<Option<Order>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM orders o WHERE o.payment_session_id = ?1 ORDER BY o.id DESC LIMIT 1",
            ORDER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![session_id], order_from_row)
            .optional()?)
    }
}
