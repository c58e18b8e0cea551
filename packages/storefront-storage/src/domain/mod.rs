//! Domain layer for the storefront
//!
//! # Domain Models
//!
//! - `Category`, `Product`, `GalleryImage`: the catalog
//! - `User`, `Session`, `Customer`: accounts
//! - `Order`, `OrderLine`, `ShippingAddress`: orders; the non-paid order is the cart
//! - `CartAction`: add / delete / remove one product in the cart
//!
//! # Port Traits
//!
//! - `CatalogStore`, `AccountStore`, `FavoriteStore`, `CartStore`, `CheckoutStore`
//! - `StorefrontStore`: all of the above
//!
//! # Examples
//!
//! ```rust,ignore
//! use storefront_storage::domain::{CartAction, CartStore};
//!
//! async fn add_one(store: impl CartStore, customer_id: i64, product_id: i64) -> Result<()> {
//!     let order = store.current_order(customer_id).await?;
//!     store.apply_cart_action(order.id, product_id, CartAction::Add).await?;
//!
//!     let cart = store.cart_summary(order.id).await?;
//!     println!("{} items, {}", cart.total_quantity, cart.total_price);
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod page;
pub mod ports;

pub use account::{Customer, CustomerDetails, FavoriteProduct, NewUser, Session, User};
pub use cart::{CartAction, CartLine, CartSummary, LineAdjustment, OrderLine};
pub use catalog::{
    first_image_url, slugify, Category, GalleryImage, Money, NewCategory, NewProduct, Product,
    DEFAULT_COLOR, DEFAULT_DESCRIPTION, DEFAULT_IMAGE, DEFAULT_INFO,
};
pub use order::{NewShippingAddress, Order, OrderState, ShippingAddress};
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE};
pub use ports::{
    AccountStore, CartStore, CatalogStore, CheckoutStore, FavoriteStore, StorefrontStore,
};
