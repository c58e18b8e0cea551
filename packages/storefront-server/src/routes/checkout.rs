use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use storefront_storage::domain::{
    Customer, CustomerDetails, Order, OrderState, ShippingAddress, StorefrontStore,
};
use storefront_storage::StorageError;
use tracing::info;

use super::CartView;
use crate::auth::CurrentUser;
use crate::cart::UserCart;
use crate::error::Result;
use crate::extract::{JsonBody, QueryParams};
use crate::forms::{CustomerForm, FormErrors, ShippingForm};
use crate::order::OrderStateMachine;
use crate::payment::CheckoutSessionRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutPage {
    pub title: &'static str,
    pub cart: CartView,
    pub customer: CustomerDetails,
    pub shipping_addresses: Vec<ShippingAddress>,
}

/// `GET /checkout`
pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<CheckoutPage>> {
    let cart = UserCart::for_user(state.store.as_ref(), &current.user).await?;
    let summary = cart.summary().await?;
    let shipping_addresses = state.store.shipping_addresses(summary.order.id).await?;

    Ok(Json(CheckoutPage {
        title: "Checkout",
        customer: cart.customer().details(),
        cart: summary.into(),
        shipping_addresses,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutRequest {
    pub customer: CustomerForm,
    pub shipping: ShippingForm,
}

#[derive(Debug, Serialize)]
pub struct CheckoutStarted {
    pub order_id: i64,
    pub session_id: String,
    pub url: String,
}

/// `POST /checkout/session`
///
/// Answers `303 See Other` pointing at the provider's checkout page.
pub async fn create_session(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(request): JsonBody<CheckoutRequest>,
) -> Result<Response> {
    let mut errors = FormErrors::new();
    errors.merge_prefixed("customer", request.customer.validate());
    errors.merge_prefixed("shipping", request.shipping.validate());
    errors.into_result()?;

    let store = state.store.as_ref();
    let cart = UserCart::for_user(store, &current.user).await?;
    let summary = cart.summary().await?;

    let session_request = CheckoutSessionRequest::from_cart(
        &summary,
        state.config.currency.as_str(),
        state.config.success_url(),
        state.config.cancel_url(),
    )?;

    store
        .update_customer(cart.customer().id, &request.customer.to_details())
        .await?;
    store
        .save_shipping_address(&request.shipping.to_address(cart.customer().id, summary.order.id))
        .await?;

    let session = state
        .payments
        .create_checkout_session(&session_request)
        .await?;

    let mut machine = OrderStateMachine::new(summary.order);
    machine.begin_payment(session.id.as_str())?;
    machine.commit(store).await?;

    // Lines may have moved between pricing and the lock
    let locked = store.cart_summary(machine.order().id).await?;
    let repriced = CheckoutSessionRequest::from_cart(
        &locked,
        state.config.currency.as_str(),
        state.config.success_url(),
        state.config.cancel_url(),
    );
    if !matches!(repriced, Ok(ref request) if *request == session_request) {
        machine.reopen()?;
        machine.commit(store).await?;
        return Err(StorageError::conflict(format!(
            "Cart of order {} changed during checkout",
            machine.order().id
        ))
        .into());
    }
    let order = machine.into_order();

    info!(
        "Order {} awaiting payment via {} session {}",
        order.id,
        state.payments.name(),
        session.id
    );

    let body = Json(CheckoutStarted {
        order_id: order.id,
        session_id: session.id,
        url: session.url.clone(),
    });
    Ok((StatusCode::SEE_OTHER, [(LOCATION, session.url)], body).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentReturn {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentOutcome {
    pub message: &'static str,
    pub order_id: i64,
    pub state: OrderState,
}

/// `GET /checkout/success?session_id=`
pub async fn success(
    State(state): State<AppState>,
    current: CurrentUser,
    QueryParams(query): QueryParams<PaymentReturn>,
) -> Result<Json<PaymentOutcome>> {
    let store = state.store.as_ref();
    let cart = UserCart::for_user(store, &current.user).await?;
    let order = returning_order(store, cart.customer(), query.session_id.as_deref()).await?;

    let mut machine = OrderStateMachine::new(order);
    machine.confirm_payment()?;
    machine.commit(store).await?;
    let order = machine.into_order();

    info!("Order {} paid", order.id);
    Ok(Json(PaymentOutcome {
        message: "Payment completed successfully",
        order_id: order.id,
        state: order.state,
    }))
}

/// `GET /checkout/cancel?session_id=`
pub async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    QueryParams(query): QueryParams<PaymentReturn>,
) -> Result<Json<PaymentOutcome>> {
    let store = state.store.as_ref();
    let cart = UserCart::for_user(store, &current.user).await?;
    let order = returning_order(store, cart.customer(), query.session_id.as_deref()).await?;

    let mut machine = OrderStateMachine::new(order);
    machine.reopen()?;
    machine.commit(store).await?;
    let order = machine.into_order();

    info!("Payment for order {} cancelled, cart reopened", order.id);
    Ok(Json(PaymentOutcome {
        message: "Payment cancelled",
        order_id: order.id,
        state: order.state,
    }))
}

/// Order the provider is redirecting back for
///
/// Without a session id this is the customer's current order. Sessions of
/// other customers are reported as unknown.
async fn returning_order(
    store: &dyn StorefrontStore,
    customer: &Customer,
    session_id: Option<&str>,
) -> Result<Order> {
    match session_id.filter(|id| !id.is_empty()) {
        Some(session_id) => Ok(store
            .order_by_payment_session(session_id)
            .await?
            .filter(|order| order.customer_id == customer.id)
            .ok_or_else(|| StorageError::not_found("Payment session", session_id))?),
        None => Ok(store.current_order(customer.id).await?),
    }
}
