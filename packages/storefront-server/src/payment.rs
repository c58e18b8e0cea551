//! Payment provider port
//!
//! The server only creates hosted checkout sessions and sends the customer to
//! the returned URL; the provider redirects back to the success or cancel
//! endpoint afterwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_storage::domain::CartSummary;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Payment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Minor currency units
    pub unit_amount: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub order_id: i64,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub mode: PaymentMode,
}

impl CheckoutSessionRequest {
    /// One line item per cart line; an empty cart cannot be paid for
    pub fn from_cart(
        cart: &CartSummary,
        currency: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Result<Self> {
        if cart.is_empty() {
            return Err(ServerError::EmptyCart);
        }

        let line_items = cart
            .lines
            .iter()
            .map(|line| LineItem {
                name: line.product.name.clone(),
                unit_amount: line.product.price.minor_units(),
                quantity: line.line.quantity,
            })
            .collect();

        Ok(Self {
            order_id: cart.order.id,
            currency: currency.into(),
            line_items,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            mode: PaymentMode::Payment,
        })
    }

    pub fn amount_total(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.unit_amount.saturating_mul(item.quantity))
            .fold(0i64, i64::saturating_add)
    }
}

/// Provider-side checkout page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<PaymentSession>;
}

/// Local stand-in for a hosted checkout provider
pub struct HostedCheckoutGateway {
    checkout_base_url: String,
}

impl HostedCheckoutGateway {
    pub fn new(checkout_base_url: impl Into<String>) -> Self {
        Self {
            checkout_base_url: checkout_base_url.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<PaymentSession> {
        let id = format!("cs_{}", Uuid::new_v4().simple());
        let url = format!("{}/{}", self.checkout_base_url.trim_end_matches('/'), id);

        info!(
            "Checkout session {} for order {}: {} {} over {} line items",
            id,
            request.order_id,
            request.amount_total(),
            request.currency,
            request.line_items.len()
        );

        Ok(PaymentSession { id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_storage::domain::{
        CartLine, Money, Order, OrderLine, OrderState, Product,
    };

    fn product(id: i64, name: &str, price: i64) -> Product {
        Product {
            id,
            category_id: 1,
            name: name.to_string(),
            slug: name.to_lowercase(),
            price: Money::from_minor(price),
            created_at: chrono::Utc::now(),
            watched: 0,
            quantity: 10,
            description: String::new(),
            info: String::new(),
            size: None,
            color: "Black".to_string(),
        }
    }

    fn cart(lines: &[(i64, &str, i64, i64)]) -> CartSummary {
        let lines = lines
            .iter()
            .map(|&(id, name, price, quantity)| {
                CartLine::new(
                    OrderLine {
                        id,
                        order_id: 7,
                        product_id: id,
                        quantity,
                        added_at: chrono::Utc::now(),
                    },
                    product(id, name, price),
                )
            })
            .collect();
        CartSummary::new(Order::new(7, 1, OrderState::Open), lines)
    }

    #[test]
    fn test_line_item_per_cart_line() {
        let cart = cart(&[(1, "Shirt", 150_000, 2), (2, "Hat", 50_000, 1)]);
        let request = CheckoutSessionRequest::from_cart(&cart, "rub", "s", "c").unwrap();

        assert_eq!(request.order_id, 7);
        assert_eq!(request.line_items.len(), 2);
        assert_eq!(
            request.line_items[0],
            LineItem {
                name: "Shirt".to_string(),
                unit_amount: 150_000,
                quantity: 2
            }
        );
        assert_eq!(request.amount_total(), 350_000);
        assert_eq!(request.amount_total(), cart.total_price.minor_units());
    }

    #[test]
    fn test_empty_cart_rejected() {
        let result = CheckoutSessionRequest::from_cart(&cart(&[]), "rub", "s", "c");
        assert!(matches!(result, Err(ServerError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_hosted_gateway_session() {
        let gateway = HostedCheckoutGateway::new("https://pay.example.com/");
        let request =
            CheckoutSessionRequest::from_cart(&cart(&[(1, "Shirt", 100, 1)]), "rub", "s", "c")
                .unwrap();

        let session = gateway.create_checkout_session(&request).await.unwrap();
        assert!(session.id.starts_with("cs_"));
        assert_eq!(session.id.len(), 35);
        assert_eq!(session.url, format!("https://pay.example.com/{}", session.id));
        assert_eq!(gateway.name(), "hosted");
    }

    #[test]
    fn test_request_serializes_mode() {
        let request =
            CheckoutSessionRequest::from_cart(&cart(&[(1, "Shirt", 100, 1)]), "rub", "s", "c")
                .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "payment");
    }
}
