use axum::{extract::State, Json};
use serde::Serialize;
use storefront_storage::domain::CartAction;
use tracing::debug;

use super::CartView;
use crate::auth::{CurrentUser, MaybeUser};
use crate::cart::UserCart;
use crate::error::Result;
use crate::extract::PathParams;
use crate::state::AppState;

/// `GET /cart`
pub async fn show(State(state): State<AppState>, current: CurrentUser) -> Result<Json<CartView>> {
    let cart = UserCart::for_user(state.store.as_ref(), &current.user).await?;
    Ok(Json(cart.summary().await?.into()))
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: i64,
}

/// `GET /cart/count`; anonymous visitors have an empty cart
pub async fn count(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<CartCount>> {
    let count = match user {
        Some(user) => {
            UserCart::for_user(state.store.as_ref(), &user)
                .await?
                .summary()
                .await?
                .total_quantity
        }
        None => 0,
    };
    Ok(Json(CartCount { count }))
}

/// `POST /cart/{product_id}/{action}`
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams((product_id, action)): PathParams<(i64, String)>,
) -> Result<Json<CartView>> {
    let action: CartAction = action.parse()?;
    debug!(
        "Cart update by user {}: {} product {}",
        current.user.id, action, product_id
    );

    let cart = UserCart::for_user(state.store.as_ref(), &current.user).await?;
    Ok(Json(cart.apply(product_id, action).await?.into()))
}

/// `DELETE /cart`
pub async fn clear(State(state): State<AppState>, current: CurrentUser) -> Result<Json<CartView>> {
    let cart = UserCart::for_user(state.store.as_ref(), &current.user).await?;
    Ok(Json(cart.clear().await?.into()))
}
