//! HTTP API
//!
//! Every handler answers with JSON; failures go through
//! [`ServerError`](crate::error::ServerError)'s response mapping.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favorites;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use storefront_storage::domain::{
    first_image_url, CartLine, CartSummary, GalleryImage, Money, OrderState, Product,
    StorefrontStore,
};

use crate::error::Result;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Catalog
        .route("/", get(catalog::home))
        .route("/categories/{slug}", get(catalog::category))
        .route("/products/{slug}", get(catalog::product))
        // Accounts
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .route("/accounts/logout", post(accounts::logout))
        // Favorites
        .route("/favorites", get(favorites::list))
        .route("/favorites/{product_slug}", post(favorites::toggle))
        // Cart
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/count", get(cart::count))
        .route("/cart/{product_id}/{action}", post(cart::update))
        // Checkout
        .route("/checkout", get(checkout::show))
        .route("/checkout/session", post(checkout::create_session))
        .route("/checkout/success", get(checkout::success))
        .route("/checkout/cancel", get(checkout::cancel))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared views
// ═══════════════════════════════════════════════════════════════════════════

/// Product as listed in grids and carousels
#[derive(Debug, Clone, Serialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub url: String,
    pub image_url: String,
    pub price_display: String,
}

impl ProductCard {
    pub fn new(product: Product, images: &[GalleryImage]) -> Self {
        Self {
            url: product.absolute_url(),
            image_url: first_image_url(images).to_string(),
            price_display: product.price.to_string(),
            product,
        }
    }

    pub async fn load(store: &dyn StorefrontStore, product: Product) -> Result<Self> {
        let images = store.product_images(product.id).await?;
        Ok(Self::new(product, &images))
    }

    pub async fn load_all(store: &dyn StorefrontStore, products: Vec<Product>) -> Result<Vec<Self>> {
        let mut cards = Vec::with_capacity(products.len());
        for product in products {
            cards.push(Self::load(store, product).await?);
        }
        Ok(cards)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub quantity: i64,
    pub stock: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            name: line.product.name.clone(),
            slug: line.product.slug.clone(),
            url: line.product.absolute_url(),
            quantity: line.line.quantity,
            stock: line.product.quantity,
            unit_price: line.product.price,
            total_price: line.total_price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub title: &'static str,
    pub order_id: i64,
    pub state: OrderState,
    pub lines: Vec<CartLineView>,
    pub total_quantity: i64,
    pub total_price: Money,
    pub total_price_display: String,
}

impl From<CartSummary> for CartView {
    fn from(cart: CartSummary) -> Self {
        Self {
            title: "Cart",
            order_id: cart.order.id,
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            total_quantity: cart.total_quantity,
            total_price: cart.total_price,
            total_price_display: cart.total_price.to_string(),
            state: cart.order.state,
        }
    }
}
