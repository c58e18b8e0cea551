use axum::{extract::State, Json};
use serde::Serialize;
use tracing::debug;

use super::ProductCard;
use crate::auth::CurrentUser;
use crate::error::Result;
use crate::extract::PathParams;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteToggled {
    pub product_slug: String,
    pub favorite: bool,
}

/// `POST /favorites/{product_slug}`
pub async fn toggle(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(product_slug): PathParams<String>,
) -> Result<Json<FavoriteToggled>> {
    let product = state.store.product_by_slug(&product_slug).await?;
    let favorite = state
        .store
        .toggle_favorite(current.user.id, product.id)
        .await?;
    debug!(
        "User {} favorite {} -> {}",
        current.user.id, product_slug, favorite
    );

    Ok(Json(FavoriteToggled {
        product_slug,
        favorite,
    }))
}

#[derive(Debug, Serialize)]
pub struct FavoritesPage {
    pub title: &'static str,
    pub products: Vec<ProductCard>,
}

/// `GET /favorites`
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<FavoritesPage>> {
    let store = state.store.as_ref();
    let products = ProductCard::load_all(store, store.favorites(current.user.id).await?).await?;
    Ok(Json(FavoritesPage {
        title: "Favorites",
        products,
    }))
}
