use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::debug;

use super::{
    category_from_row, exists, load_product, on_conflict, product_from_row,
    SqliteStorefrontStore, CATEGORY_COLUMNS, PRODUCT_COLUMNS,
};
use crate::domain::{
    CatalogStore, Category, GalleryImage, NewCategory, NewProduct, Page, PageRequest, Product,
    DEFAULT_COLOR, DEFAULT_DESCRIPTION, DEFAULT_INFO,
};
use crate::{Result, StorageError};

#[async_trait]
impl CatalogStore for SqliteStorefrontStore {
    async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        if category.name.trim().is_empty() {
            return Err(StorageError::validation("Category name must not be empty"));
        }

        let conn = self.conn.lock();
        if let Some(parent_id) = category.parent_id {
            if !exists(&conn, "categories", parent_id)? {
                return Err(StorageError::not_found("Category", parent_id));
            }
        }

        let slug = category.resolved_slug();
        conn.execute(
            "INSERT INTO categories (name, image, slug, parent_id) VALUES (?1, ?2, ?3, ?4)",
            params![&category.name, &category.image, &slug, category.parent_id],
        )
        .map_err(|e| on_conflict(e, || format!("Category slug already exists: {}", slug)))?;

        let id = conn.last_insert_rowid();
        debug!("Created category {} ({})", id, slug);

        Ok(Category {
            id,
            name: category.name.clone(),
            image: category.image.clone(),
            slug,
            parent_id: category.parent_id,
        })
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Category> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM categories c WHERE c.slug = ?1", CATEGORY_COLUMNS);
        conn.query_row(&sql, params![slug], category_from_row)
            .optional()?
            .ok_or_else(|| StorageError::not_found("Category", slug))
    }

    async fn root_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM categories c WHERE c.parent_id IS NULL ORDER BY c.id",
            CATEGORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    async fn subcategories(&self, parent_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM categories c WHERE c.parent_id = ?1 ORDER BY c.id",
            CATEGORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map(params![parent_id], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    async fn count_products(&self, category_id: i64) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        product.validate()?;

        let conn = self.conn.lock();
        if !exists(&conn, "categories", product.category_id)? {
            return Err(StorageError::not_found("Category", product.category_id));
        }

        let created = Product {
            id: 0,
            category_id: product.category_id,
            name: product.name.clone(),
            slug: product.resolved_slug(),
            price: product.price,
            created_at: Utc::now(),
            watched: 0,
            quantity: product.quantity,
            description: product
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            info: product
                .info
                .clone()
                .unwrap_or_else(|| DEFAULT_INFO.to_string()),
            size: product.size.or(Some(0.0)),
            color: product
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        };

        conn.execute(
            "INSERT INTO products (category_id, name, slug, price_minor, created_at, watched, \
             quantity, description, info, size, color)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10)",
            params![
                created.category_id,
                &created.name,
                &created.slug,
                created.price.minor_units(),
                created.created_at,
                created.quantity,
                &created.description,
                &created.info,
                created.size,
                &created.color,
            ],
        )
        .map_err(|e| on_conflict(e, || format!("Product slug already exists: {}", created.slug)))?;

        let id = conn.last_insert_rowid();
        debug!("Created product {} ({})", id, created.slug);
        Ok(Product { id, ..created })
    }

    async fn add_product_image(&self, product_id: i64, url: &str) -> Result<GalleryImage> {
        if url.trim().is_empty() {
            return Err(StorageError::validation("Image URL must not be empty"));
        }

        let conn = self.conn.lock();
        if !exists(&conn, "products", product_id)? {
            return Err(StorageError::not_found("Product", product_id));
        }
        conn.execute(
            "INSERT INTO gallery_images (product_id, url) VALUES (?1, ?2)",
            params![product_id, url],
        )?;

        Ok(GalleryImage {
            id: conn.last_insert_rowid(),
            product_id,
            url: url.to_string(),
        })
    }

    async fn product(&self, product_id: i64) -> Result<Product> {
        let conn = self.conn.lock();
        load_product(&conn, product_id)
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Product> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM products p WHERE p.slug = ?1", PRODUCT_COLUMNS);
        conn.query_row(&sql, params![slug], |row| product_from_row(row, 0))
            .optional()?
            .ok_or_else(|| StorageError::not_found("Product", slug))
    }

    async fn product_images(&self, product_id: i64) -> Result<Vec<GalleryImage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, product_id, url FROM gallery_images WHERE product_id = ?1 ORDER BY id",
        )?;
        let images = stmt
            .query_map(params![product_id], |row| {
                Ok(GalleryImage {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(images)
    }

    async fn top_products(&self, limit: usize) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM products p ORDER BY p.watched DESC, p.id ASC LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![limit as i64], |row| product_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    async fn products_in_categories(
        &self,
        category_ids: &[i64],
        page: PageRequest,
    ) -> Result<Page<Product>> {
        if category_ids.is_empty() {
            page.ensure_in_range(0)?;
            return Ok(Page::new(Vec::new(), page, 0));
        }

        let conn = self.conn.lock();
        let placeholders = vec!["?"; category_ids.len()].join(", ");

        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM products WHERE category_id IN ({})",
                placeholders
            ),
            params_from_iter(category_ids.iter()),
            |row| row.get(0),
        )?;
        let total = total as u64;
        page.ensure_in_range(total)?;

        let sql = format!(
            "SELECT {} FROM products p WHERE p.category_id IN ({}) ORDER BY p.id LIMIT ? OFFSET ?",
            PRODUCT_COLUMNS, placeholders
        );
        let mut bind: Vec<i64> = category_ids.to_vec();
        bind.push(i64::from(page.per_page));
        bind.push(page.offset() as i64);

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bind.iter()), |row| product_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(items, page, total))
    }

    async fn related_products(&self, product: &Product, limit: usize) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM products p WHERE p.category_id = ?1 AND p.id != ?2 ORDER BY p.id LIMIT ?3",
            PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![product.category_id, product.id, limit as i64], |row| {
                product_from_row(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    async fn record_product_view(&self, slug: &str) -> Result<Product> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE products SET watched = watched + 1 WHERE slug = ?1",
            params![slug],
        )?;
        if updated == 0 {
            return Err(StorageError::not_found("Product", slug));
        }

        let sql = format!("SELECT {} FROM products p WHERE p.slug = ?1", PRODUCT_COLUMNS);
        Ok(conn.query_row(&sql, params![slug], |row| product_from_row(row, 0))?)
    }
}
