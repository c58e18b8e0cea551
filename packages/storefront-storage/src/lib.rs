//! Storefront storage: domain model and persistence
//!
//! ## Core Principles
//!
//! 1. **One cart per customer**: the cart is the customer's latest non-paid order
//! 2. **Units are conserved**: a cart line and its product's stock move one for one
//! 3. **Ports first**: handlers only see the traits in [`domain::ports`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_storage::{SqliteStorefrontStore, domain::*};
//!
//! let store = SqliteStorefrontStore::open("storefront.db")?;
//!
//! let shoes = store.create_category(&NewCategory::new("Shoes")).await?;
//! let product = store
//!     .create_product(&NewProduct::new(shoes.id, "Sneakers", Money::parse("4990")?).with_quantity(5))
//!     .await?;
//!
//! let customer = store.customer_for_user(user.id).await?;
//! let order = store.current_order(customer.id).await?;
//! store.apply_cart_action(order.id, product.id, CartAction::Add).await?;
//! ```

pub mod domain;
pub mod error;

#[cfg(feature = "sqlite")]
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteStorefrontStore;
