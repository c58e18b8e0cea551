use storefront_storage::domain::{CartAction, CartSummary, Customer, Order, StorefrontStore, User};
use tracing::debug;

use crate::error::Result;
use crate::order::OrderStateMachine;

/// Cart of a signed-in user
///
/// The cart is the customer's current non-paid order; the customer profile
/// is created on first access.
pub struct UserCart<'a> {
    store: &'a dyn StorefrontStore,
    customer: Customer,
}

impl<'a> UserCart<'a> {
    pub async fn for_user(store: &'a dyn StorefrontStore, user: &User) -> Result<Self> {
        let customer = store.customer_for_user(user.id).await?;
        Ok(Self { store, customer })
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub async fn order(&self) -> Result<Order> {
        Ok(self.store.current_order(self.customer.id).await?)
    }

    pub async fn summary(&self) -> Result<CartSummary> {
        let order = self.order().await?;
        Ok(self.store.cart_summary(order.id).await?)
    }

    pub async fn apply(&self, product_id: i64, action: CartAction) -> Result<CartSummary> {
        let order = self.order().await?;
        OrderStateMachine::ensure_editable(&order)?;

        let adjustment = self
            .store
            .apply_cart_action(order.id, product_id, action)
            .await?;
        debug!(
            "Customer {} {} product {}: {} in cart",
            self.customer.id, action, product_id, adjustment.line_quantity
        );

        Ok(self.store.cart_summary(order.id).await?)
    }

    pub async fn clear(&self) -> Result<CartSummary> {
        let order = self.order().await?;
        OrderStateMachine::ensure_editable(&order)?;
        self.store.clear_cart(order.id).await?;
        Ok(self.store.cart_summary(order.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use storefront_storage::domain::{
        AccountStore, CatalogStore, CheckoutStore, Money, NewCategory, NewProduct, NewUser,
        OrderState,
    };
    use storefront_storage::SqliteStorefrontStore;

    async fn fixture() -> (SqliteStorefrontStore, User, i64) {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        let user = store
            .create_user(&NewUser {
                username: "alice".to_string(),
                email: String::new(),
                password_hash: "x".to_string(),
                salt: "y".to_string(),
            })
            .await
            .unwrap();
        let category = store
            .create_category(&NewCategory::new("Shirts"))
            .await
            .unwrap();
        let product = store
            .create_product(
                &NewProduct::new(category.id, "White shirt", Money::from_minor(150_000))
                    .with_quantity(2),
            )
            .await
            .unwrap();
        (store, user, product.id)
    }

    #[tokio::test]
    async fn test_apply_and_clear() {
        let (store, user, product_id) = fixture().await;
        let cart = UserCart::for_user(&store, &user).await.unwrap();

        cart.apply(product_id, CartAction::Add).await.unwrap();
        let summary = cart.apply(product_id, CartAction::Add).await.unwrap();
        assert_eq!(summary.total_quantity, 2);
        assert_eq!(summary.total_price, Money::from_minor(300_000));
        assert_eq!(store.product(product_id).await.unwrap().quantity, 0);

        let summary = cart.clear().await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(store.product(product_id).await.unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_locked_while_awaiting_payment() {
        let (store, user, product_id) = fixture().await;
        let cart = UserCart::for_user(&store, &user).await.unwrap();
        cart.apply(product_id, CartAction::Add).await.unwrap();

        let mut order = cart.order().await.unwrap();
        order.state = OrderState::AwaitingPayment {
            session_id: "cs_1".to_string(),
            started_at: chrono::Utc::now(),
        };
        store
            .save_order_state(&order, &OrderState::Open)
            .await
            .unwrap();

        assert!(matches!(
            cart.apply(product_id, CartAction::Add).await,
            Err(ServerError::InvalidStateTransition { .. })
        ));
        assert!(cart.clear().await.is_err());
        assert_eq!(cart.summary().await.unwrap().total_quantity, 1);
    }
}
