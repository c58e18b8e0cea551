use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use storefront_storage::domain::{Category, GalleryImage, Page, PageRequest, StorefrontStore};

use super::ProductCard;
use crate::auth::MaybeUser;
use crate::error::Result;
use crate::extract::{PathParams, QueryParams};
use crate::state::AppState;

const TOP_PRODUCTS: usize = 3;
const RELATED_PRODUCTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub url: String,
    pub image_url: String,
    pub product_count: u64,
}

impl CategoryView {
    async fn load(store: &dyn StorefrontStore, category: Category) -> Result<Self> {
        let product_count = store.count_products(category.id).await?;
        Ok(Self {
            url: category.absolute_url(),
            image_url: category.image_url().to_string(),
            product_count,
            category,
        })
    }

    async fn load_all(store: &dyn StorefrontStore, categories: Vec<Category>) -> Result<Vec<Self>> {
        let mut views = Vec::with_capacity(categories.len());
        for category in categories {
            views.push(Self::load(store, category).await?);
        }
        Ok(views)
    }
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub title: &'static str,
    pub categories: Vec<CategoryView>,
    pub top_products: Vec<ProductCard>,
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Result<Json<HomePage>> {
    let store = state.store.as_ref();

    let categories = CategoryView::load_all(store, store.root_categories().await?).await?;
    let top_products =
        ProductCard::load_all(store, store.top_products(TOP_PRODUCTS).await?).await?;

    Ok(Json(HomePage {
        title: "Home",
        categories,
        top_products,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    /// Subcategory slug to narrow the listing to
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub title: String,
    pub category: CategoryView,
    pub filters: Vec<CategoryView>,
    pub selected: Option<String>,
    pub products: Page<ProductCard>,
}

/// `GET /categories/{slug}?type=<sub-slug>&page=N`
pub async fn category(
    State(state): State<AppState>,
    PathParams(slug): PathParams<String>,
    QueryParams(query): QueryParams<CategoryQuery>,
) -> Result<Json<CategoryPage>> {
    let store = state.store.as_ref();

    let parent = store.category_by_slug(&slug).await?;
    let filters = store.subcategories(parent.id).await?;

    let selected = query.kind.filter(|kind| !kind.trim().is_empty());
    let category_ids: Vec<i64> = match &selected {
        // an unknown filter just matches nothing
        Some(kind) => match store.category_by_slug(kind).await {
            Ok(category) => vec![category.id],
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        },
        None => filters.iter().map(|c| c.id).collect(),
    };

    let request = PageRequest::new(query.page.unwrap_or(1), state.config.page_size);
    let page = store.products_in_categories(&category_ids, request).await?;

    let mut items = Vec::with_capacity(page.items.len());
    for product in page.items {
        items.push(ProductCard::load(store, product).await?);
    }
    let products = Page {
        items,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        num_pages: page.num_pages,
    };

    Ok(Json(CategoryPage {
        title: parent.name.clone(),
        category: CategoryView::load(store, parent).await?,
        filters: CategoryView::load_all(store, filters).await?,
        selected,
        products,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub title: String,
    pub product: ProductCard,
    pub images: Vec<GalleryImage>,
    pub related: Vec<ProductCard>,
    pub is_favorite: bool,
}

/// `GET /products/{slug}`; every hit counts as a view
pub async fn product(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    PathParams(slug): PathParams<String>,
) -> Result<Json<ProductPage>> {
    let store = state.store.as_ref();

    let product = store.record_product_view(&slug).await?;
    let images = store.product_images(product.id).await?;
    let related = ProductCard::load_all(
        store,
        store.related_products(&product, RELATED_PRODUCTS).await?,
    )
    .await?;

    let is_favorite = match &user {
        Some(user) => store
            .favorites(user.id)
            .await?
            .iter()
            .any(|p| p.id == product.id),
        None => false,
    };

    Ok(Json(ProductPage {
        title: product.name.clone(),
        product: ProductCard::new(product, &images),
        images,
        related,
        is_favorite,
    }))
}
