//! Catalog models: categories, products, gallery images, money

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

use crate::{Result, StorageError};

/// Placeholder shown when a category or product has no image
pub const DEFAULT_IMAGE: &str = "https://stilsoft.ru/images/catalog/noup.png";

pub const DEFAULT_DESCRIPTION: &str = "Description coming soon...";
pub const DEFAULT_INFO: &str = "Additional product information";
pub const DEFAULT_COLOR: &str = "Black";

// ═══════════════════════════════════════════════════════════════════════════
// Money
// ═══════════════════════════════════════════════════════════════════════════

/// Amount in minor currency units (kopecks, cents)
///
/// Serialized as the bare integer. `Display` renders the major-unit form
/// with two decimals.
///
/// ```rust
/// use storefront_storage::domain::Money;
///
/// let price = Money::parse("1234.5").unwrap();
/// assert_eq!(price.minor_units(), 123_450);
/// assert_eq!(price.to_string(), "1234.50");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Parse a non-negative decimal amount with at most two fractional digits
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let invalid = || StorageError::validation(format!("Invalid amount: {:?}", input));

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .map(Money)
            .ok_or_else(invalid)
    }

    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Saturates at `i64::MAX` minor units instead of overflowing
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.fold(0i64, |acc, m| acc.saturating_add(m.0)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Category
// ═══════════════════════════════════════════════════════════════════════════

/// Catalog category
///
/// Categories form a tree through `parent_id`. The home page lists the
/// roots; a root's page lists products of its direct subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub slug: String,
    pub parent_id: Option<i64>,
}

impl Category {
    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }

    pub fn absolute_url(&self) -> String {
        format!("/categories/{}", self.slug)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Category to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            image: None,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    /// Explicit slug, or one derived from the name
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slugify(slug),
            _ => slugify(&self.name),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Product
// ═══════════════════════════════════════════════════════════════════════════

/// Catalog product
///
/// `quantity` is the stock on hand; the cart moves units between it and
/// order lines. `watched` counts detail page views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub watched: i64,
    pub quantity: i64,
    pub description: String,
    pub info: String,
    pub size: Option<f64>,
    pub color: String,
}

impl Product {
    pub fn absolute_url(&self) -> String {
        format!("/products/{}", self.slug)
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Product to be inserted; unset fields take the catalog defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewProduct {
    pub fn new(category_id: i64, name: impl Into<String>, price: Money) -> Self {
        Self {
            category_id,
            name: name.into(),
            price,
            slug: None,
            quantity: 0,
            description: None,
            info: None,
            size: None,
            color: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slugify(slug),
            _ => slugify(&self.name),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StorageError::validation("Product name must not be empty"));
        }
        if self.name.chars().count() > 255 {
            return Err(StorageError::validation("Product name exceeds 255 characters"));
        }
        if self.price.minor_units() < 0 {
            return Err(StorageError::validation("Product price must not be negative"));
        }
        if self.quantity < 0 {
            return Err(StorageError::validation("Product quantity must not be negative"));
        }
        Ok(())
    }
}

/// Product gallery image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
}

/// URL of the first gallery image, or the placeholder
pub fn first_image_url(images: &[GalleryImage]) -> &str {
    images.first().map(|img| img.url.as_str()).unwrap_or(DEFAULT_IMAGE)
}

// ═══════════════════════════════════════════════════════════════════════════
// Slugs
// ═══════════════════════════════════════════════════════════════════════════

/// URL slug from a display name
///
/// Lowercases, transliterates Cyrillic, and collapses everything that is not
/// an ASCII alphanumeric into single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let piece: Option<&str> = if ch.is_ascii_alphanumeric() {
            None
        } else {
            transliterate(ch)
        };

        if ch.is_ascii_alphanumeric() || piece.is_some_and(|p| !p.is_empty()) {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            match piece {
                Some(p) => slug.push_str(p),
                None => slug.push(ch),
            }
        } else if piece.is_none() {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

fn transliterate(ch: char) -> Option<&'static str> {
    let out = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        // hard/soft signs vanish without breaking the word
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ═══════════════════════════════════════════════════════════════════════
    // Money Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_money_parse() {
        assert_eq!(Money::parse("1234.50").unwrap().minor_units(), 123_450);
        assert_eq!(Money::parse("1234.5").unwrap().minor_units(), 123_450);
        assert_eq!(Money::parse("1234").unwrap().minor_units(), 123_400);
        assert_eq!(Money::parse("0.05").unwrap().minor_units(), 5);
        assert_eq!(Money::parse(" 7. ").unwrap().minor_units(), 700);
    }

    #[test]
    fn test_money_parse_rejects_garbage() {
        for bad in ["", "-1", "1.234", "abc", "1,50", ".5", "1.-5"] {
            assert!(Money::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(0).to_string(), "0.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(199_900).to_string(), "1999.00");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_money_sum_and_mul() {
        let total: Money = [Money::from_minor(100), Money::from_minor(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_minor(350));
        assert_eq!(Money::from_minor(150).checked_mul(3), Some(Money::from_minor(450)));
        assert_eq!(Money::from_minor(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn test_money_sum_saturates() {
        let price = Money::parse("50000000000000000").unwrap();
        let total: Money = [price, price].into_iter().sum();
        assert_eq!(total, Money::from_minor(i64::MAX));

        let total: Money = [Money::from_minor(i64::MAX), Money::from_minor(-5)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_minor(i64::MAX - 5));
    }

    #[test]
    fn test_money_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_minor(4200)).unwrap();
        assert_eq!(json, "4200");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Category / Product Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_category_image_fallback() {
        let mut category = Category {
            id: 1,
            name: "Shoes".to_string(),
            image: None,
            slug: "shoes".to_string(),
            parent_id: None,
        };
        assert_eq!(category.image_url(), DEFAULT_IMAGE);
        assert_eq!(category.absolute_url(), "/categories/shoes");
        assert!(category.is_root());

        category.image = Some("/media/categories/shoes.png".to_string());
        assert_eq!(category.image_url(), "/media/categories/shoes.png");
    }

    #[test]
    fn test_new_product_validation() {
        let product = NewProduct::new(1, "Sneakers", Money::from_minor(500));
        assert!(product.validate().is_ok());
        assert_eq!(product.resolved_slug(), "sneakers");

        let empty = NewProduct::new(1, "  ", Money::from_minor(500));
        assert!(empty.validate().is_err());

        let negative = NewProduct::new(1, "Boots", Money::from_minor(-1));
        assert!(negative.validate().is_err());

        let oversold = NewProduct::new(1, "Boots", Money::ZERO).with_quantity(-3);
        assert!(oversold.validate().is_err());
    }

    #[test]
    fn test_first_image_url() {
        assert_eq!(first_image_url(&[]), DEFAULT_IMAGE);

        let images = vec![
            GalleryImage {
                id: 1,
                product_id: 9,
                url: "/media/products/a.jpg".to_string(),
            },
            GalleryImage {
                id: 2,
                product_id: 9,
                url: "/media/products/b.jpg".to_string(),
            },
        ];
        assert_eq!(first_image_url(&images), "/media/products/a.jpg");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Slug Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_slugify_ascii() {
        assert_eq!(slugify("Running Shoes"), "running-shoes");
        assert_eq!(slugify("  T-Shirt  (XL) "), "t-shirt-xl");
        assert_eq!(slugify("!!!"), "item");
    }

    #[test]
    fn test_slugify_cyrillic() {
        assert_eq!(slugify("Мужская обувь"), "muzhskaya-obuv");
        assert_eq!(slugify("Объектив 50мм"), "obektiv-50mm");
    }

    #[test]
    fn test_explicit_slug_is_normalized() {
        let category = NewCategory::new("Women").with_slug("Women Shoes");
        assert_eq!(category.resolved_slug(), "women-shoes");
    }
}
