//! Catalog import for `storefront seed`
//!
//! ```yaml
//! categories:
//!   - name: Clothes
//!     image: https://cdn.example.com/clothes.png
//!     subcategories:
//!       - name: Shirts
//!         products:
//!           - name: White shirt
//!             price: "1500.00"
//!             quantity: 3
//!             images:
//!               - https://cdn.example.com/white-shirt.png
//! ```

use std::collections::VecDeque;
use std::path::Path;

use serde::Deserialize;
use storefront_storage::domain::{Money, NewCategory, NewProduct, StorefrontStore};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    /// Decimal string, e.g. `"1499.90"`
    pub price: String,
    #[serde(default)]
    pub quantity: i64,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub info: Option<String>,
    pub color: Option<String>,
    pub size: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
    pub images: usize,
}

impl CatalogSeed {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check every product in the tree without touching storage
    pub fn validate(&self) -> Result<()> {
        let mut pending: Vec<&SeedCategory> = self.categories.iter().collect();
        while let Some(category) = pending.pop() {
            for product in &category.products {
                product.to_new_product(0)?.validate()?;
            }
            pending.extend(category.subcategories.iter());
        }
        Ok(())
    }
}

impl SeedProduct {
    fn to_new_product(&self, category_id: i64) -> Result<NewProduct> {
        let mut product = NewProduct::new(category_id, self.name.as_str(), Money::parse(&self.price)?)
            .with_quantity(self.quantity);
        if let Some(slug) = &self.slug {
            product = product.with_slug(slug.as_str());
        }
        if let Some(description) = &self.description {
            product = product.with_description(description.as_str());
        }
        if let Some(color) = &self.color {
            product = product.with_color(color.as_str());
        }
        if let Some(size) = self.size {
            product = product.with_size(size);
        }
        product.info = self.info.clone();
        Ok(product)
    }
}

/// Insert every category (parents before children) with its products
///
/// Prices, names and quantities are checked for the whole file before the
/// first insert. Inserts are not transactional: a slug that collides with
/// an existing row still stops the import part way.
pub async fn seed_catalog(store: &dyn StorefrontStore, seed: &CatalogSeed) -> Result<SeedReport> {
    seed.validate()?;

    let mut report = SeedReport::default();
    let mut queue: VecDeque<(&SeedCategory, Option<i64>)> =
        seed.categories.iter().map(|c| (c, None)).collect();

    while let Some((entry, parent_id)) = queue.pop_front() {
        let mut new_category = NewCategory::new(entry.name.as_str());
        if let Some(parent_id) = parent_id {
            new_category = new_category.with_parent(parent_id);
        }
        if let Some(slug) = &entry.slug {
            new_category = new_category.with_slug(slug.as_str());
        }
        if let Some(image) = &entry.image {
            new_category = new_category.with_image(image.as_str());
        }

        let category = store.create_category(&new_category).await?;
        report.categories += 1;
        debug!("Seeded category {} ({})", category.slug, category.id);

        for seed_product in &entry.products {
            let product = store
                .create_product(&seed_product.to_new_product(category.id)?)
                .await?;
            report.products += 1;

            for url in &seed_product.images {
                store.add_product_image(product.id, url).await?;
                report.images += 1;
            }
        }

        queue.extend(entry.subcategories.iter().map(|c| (c, Some(category.id))));
    }

    info!(
        "Seeded {} categories, {} products, {} images",
        report.categories, report.products, report.images
    );
    Ok(report)
}
