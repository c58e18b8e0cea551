//! Port traits implemented by storage adapters

use async_trait::async_trait;

use super::account::{Customer, CustomerDetails, NewUser, Session, User};
use super::cart::{CartAction, CartSummary, LineAdjustment};
use super::catalog::{Category, GalleryImage, NewCategory, NewProduct, Product};
use super::order::{NewShippingAddress, Order, OrderState, ShippingAddress};
use super::page::{Page, PageRequest};
use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════════

/// Categories, products and their gallery
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a category; duplicate slug → `Conflict`, unknown parent → `NotFound`
    async fn create_category(&self, category: &NewCategory) -> Result<Category>;

    async fn category_by_slug(&self, slug: &str) -> Result<Category>;

    /// Categories without a parent, in insertion order
    async fn root_categories(&self) -> Result<Vec<Category>>;

    /// Direct children of `parent_id`
    async fn subcategories(&self, parent_id: i64) -> Result<Vec<Category>>;

    async fn count_products(&self, category_id: i64) -> Result<u64>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product>;

    async fn add_product_image(&self, product_id: i64, url: &str) -> Result<GalleryImage>;

    async fn product(&self, product_id: i64) -> Result<Product>;

    async fn product_by_slug(&self, slug: &str) -> Result<Product>;

    async fn product_images(&self, product_id: i64) -> Result<Vec<GalleryImage>>;

    /// Most viewed products first
    async fn top_products(&self, limit: usize) -> Result<Vec<Product>>;

    /// Products whose category is one of `category_ids`
    ///
    /// Pages past the end → `NotFound`.
    async fn products_in_categories(
        &self,
        category_ids: &[i64],
        page: PageRequest,
    ) -> Result<Page<Product>>;

    /// Other products of the same category
    async fn related_products(&self, product: &Product, limit: usize) -> Result<Vec<Product>>;

    /// Bump the view counter in place and return the updated product
    async fn record_product_view(&self, slug: &str) -> Result<Product>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Accounts
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Duplicate username → `Conflict`
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn user(&self, user_id: i64) -> Result<User>;

    async fn create_session(&self, session: &Session) -> Result<()>;

    async fn session(&self, token: &str) -> Result<Option<Session>>;

    async fn delete_session(&self, token: &str) -> Result<()>;

    /// Customer profile of a user, created with empty fields on first use
    async fn customer_for_user(&self, user_id: i64) -> Result<Customer>;

    async fn update_customer(&self, customer_id: i64, details: &CustomerDetails)
        -> Result<Customer>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Favorites
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Add the product if absent, remove it if present
    ///
    /// Returns `true` when the product is a favorite afterwards.
    async fn toggle_favorite(&self, user_id: i64, product_id: i64) -> Result<bool>;

    /// Favorite products in the order they were added
    async fn favorites(&self, user_id: i64) -> Result<Vec<Product>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Cart
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Latest non-paid order of the customer; a fresh `Open` one if none
    async fn current_order(&self, customer_id: i64) -> Result<Order>;

    async fn cart_summary(&self, order_id: i64) -> Result<CartSummary>;

    /// Apply `action` to the order's line for `product_id`
    ///
    /// Line and product stock are updated in a single transaction; a line
    /// left below one unit is deleted. Unknown product → `NotFound`.
    async fn apply_cart_action(
        &self,
        order_id: i64,
        product_id: i64,
        action: CartAction,
    ) -> Result<LineAdjustment>;

    /// Delete every line, returning the units to stock
    async fn clear_cart(&self, order_id: i64) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Checkout
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn save_shipping_address(&self, address: &NewShippingAddress)
        -> Result<ShippingAddress>;

    async fn shipping_addresses(&self, order_id: i64) -> Result<Vec<ShippingAddress>>;

    /// Persist `order.state` (and bump `updated_at`) only while the stored
    /// state still equals `expected`; otherwise `Conflict`
    async fn save_order_state(&self, order: &Order, expected: &OrderState) -> Result<()>;

    async fn order(&self, order_id: i64) -> Result<Order>;

    async fn order_by_payment_session(&self, session_id: &str) -> Result<Option<Order>>;
}

/// Everything the storefront needs from storage
pub trait StorefrontStore:
    CatalogStore + AccountStore + FavoriteStore + CartStore + CheckoutStore
{
}

impl<T> StorefrontStore for T where
    T: CatalogStore + AccountStore + FavoriteStore + CartStore + CheckoutStore
{
}
