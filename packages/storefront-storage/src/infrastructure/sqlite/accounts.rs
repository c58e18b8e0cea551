use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{
    customer_from_row, exists, load_product, on_conflict, product_from_row, user_from_row,
    SqliteStorefrontStore, CUSTOMER_COLUMNS, PRODUCT_COLUMNS, USER_COLUMNS,
};
use crate::domain::{
    AccountStore, Customer, CustomerDetails, FavoriteStore, NewUser, Product, Session, User,
};
use crate::{Result, StorageError};

#[async_trait]
impl AccountStore for SqliteStorefrontStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn.lock();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO users (username, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &user.username,
                &user.email,
                &user.password_hash,
                &user.salt,
                created_at
            ],
        )
        .map_err(|e| on_conflict(e, || format!("Username already taken: {}", user.username)))?;

        let id = conn.last_insert_rowid();
        debug!("Registered user {} ({})", id, user.username);

        Ok(User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            salt: user.salt.clone(),
            created_at,
        })
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS);
        Ok(conn
            .query_row(&sql, params![username], user_from_row)
            .optional()?)
    }

    async fn user(&self, user_id: i64) -> Result<User> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS);
        conn.query_row(&sql, params![user_id], user_from_row)
            .optional()?
            .ok_or_else(|| StorageError::not_found("User", user_id))
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                &session.token,
                session.user_id,
                session.created_at,
                session.expires_at
            ],
        )?;
        Ok(())
    }

    async fn session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| {
                    Ok(Session {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    async fn customer_for_user(&self, user_id: i64) -> Result<Customer> {
        let conn = self.conn.lock();
        if !exists(&conn, "users", user_id)? {
            return Err(StorageError::not_found("User", user_id));
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO customers (user_id) VALUES (?1)",
            params![user_id],
        )?;
        if inserted > 0 {
            debug!("Created customer profile for user {}", user_id);
        }

        let sql = format!("SELECT {} FROM customers cu WHERE cu.user_id = ?1", CUSTOMER_COLUMNS);
        Ok(conn.query_row(&sql, params![user_id], customer_from_row)?)
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        details: &CustomerDetails,
    ) -> Result<Customer> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE customers SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4
             WHERE id = ?5",
            params![
                &details.first_name,
                &details.last_name,
                &details.email,
                &details.phone,
                customer_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::not_found("Customer", customer_id));
        }

        let sql = format!("SELECT {} FROM customers cu WHERE cu.id = ?1", CUSTOMER_COLUMNS);
        Ok(conn.query_row(&sql, params![customer_id], customer_from_row)?)
    }
}

#[async_trait]
impl FavoriteStore for SqliteStorefrontStore {
    async fn toggle_favorite(&self, user_id: i64, product_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        if !exists(&conn, "users", user_id)? {
            return Err(StorageError::not_found("User", user_id));
        }
        load_product(&conn, product_id)?;

        let removed = conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND product_id = ?2",
            params![user_id, product_id],
        )?;
        if removed > 0 {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO favorites (user_id, product_id, added_at) VALUES (?1, ?2, ?3)",
            params![user_id, product_id, Utc::now()],
        )?;
        Ok(true)
    }

    async fn favorites(&self, user_id: i64) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM favorites f JOIN products p ON p.id = f.product_id
             WHERE f.user_id = ?1 ORDER BY f.rowid",
            PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![user_id], |row| product_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }
}
