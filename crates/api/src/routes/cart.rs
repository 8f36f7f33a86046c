//! Cart route handlers.
//!
//! Every response carries the full cart projection with unit prices
//! resolved live from the catalogue in both currencies - a price change in
//! the catalogue shows up on the very next read.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use duka_core::{CartId, CartItemId, Currency, ProductId, SessionToken, VariantId};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::catalogue::CatalogueRepository;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::cart::{Cart, CartLine, CartTotals};
use crate::state::AppState;

/// Cart line projection.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineResponse {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub quantity: i32,
    pub unit_price_usd: Decimal,
    pub unit_price_kes: Decimal,
    pub line_total_usd: Decimal,
    pub line_total_kes: Decimal,
}

impl From<&CartLine> for CartLineResponse {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            variant_id: line.variant_id,
            product_name: line.product_name.clone(),
            variant_name: line.variant_name.clone(),
            sku: line.sku.clone(),
            quantity: line.quantity,
            unit_price_usd: line.unit_price_usd,
            unit_price_kes: line.unit_price_kes,
            line_total_usd: line.line_total(Currency::USD),
            line_total_kes: line.line_total(Currency::KES),
        }
    }
}

/// Cart projection.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub items: Vec<CartLineResponse>,
    pub item_count: i64,
    pub subtotal_usd: Decimal,
    pub subtotal_kes: Decimal,
}

impl CartResponse {
    fn build(cart: &Cart, lines: &[CartLine]) -> Self {
        let usd = CartTotals::compute(lines, Currency::USD);
        let kes = CartTotals::compute(lines, Currency::KES);

        Self {
            id: cart.id,
            items: lines.iter().map(CartLineResponse::from).collect(),
            item_count: usd.item_count,
            subtotal_usd: usd.subtotal,
            subtotal_kes: kes.subtotal,
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub product_id: Uuid,
    pub variant_id: Option<i64>,
    pub quantity: Option<i32>,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemPayload {
    pub quantity: i32,
}

/// Cart merge request body.
#[derive(Debug, Deserialize)]
pub struct MergePayload {
    pub session_token: String,
}

/// Load the caller's cart and project it.
async fn load_cart_response(state: &AppState, identity: &Identity) -> Result<CartResponse> {
    let repo = CartRepository::new(state.pool());
    let cart = repo.get_or_create(identity, Utc::now()).await?;
    let lines = repo.priced_lines(cart.id).await?;
    Ok(CartResponse::build(&cart, &lines))
}

/// Get the caller's cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, identity: Identity) -> Result<Json<CartResponse>> {
    Ok(Json(load_cart_response(&state, &identity).await?))
}

/// Add an item to the caller's cart.
///
/// An existing (product, variant) line has its quantity incremented instead
/// of a duplicate line appearing.
#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::BadRequest("quantity must be positive".to_string()));
    }

    let catalogue = CatalogueRepository::new(state.pool());
    let product_id = ProductId::new(payload.product_id);
    let product = catalogue
        .get_product(product_id)
        .await?
        .ok_or(AppError::ProductNotFound)?;

    let variant_id = match payload.variant_id {
        Some(raw) => {
            let variant_id = VariantId::new(raw);
            let variant = catalogue
                .get_variant(variant_id)
                .await?
                .ok_or(AppError::VariantNotFound)?;
            if variant.product_id != product.id {
                return Err(AppError::VariantNotFound);
            }
            Some(variant_id)
        }
        None => None,
    };

    let repo = CartRepository::new(state.pool());
    let now = Utc::now();
    let cart = repo.get_or_create(&identity, now).await?;
    repo.add_item(cart.id, product.id, variant_id, quantity, now)
        .await?;

    let response = load_cart_response(&state, &identity).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Set a cart line's quantity; zero or less removes the line.
#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<Json<CartResponse>> {
    let repo = CartRepository::new(state.pool());
    let now = Utc::now();
    let cart = repo.get_or_create(&identity, now).await?;

    repo.set_quantity(cart.id, CartItemId::new(item_id), payload.quantity, now)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("cart item not found".to_string()),
            other => AppError::Database(other),
        })?;

    Ok(Json(load_cart_response(&state, &identity).await?))
}

/// Remove a line from the caller's cart.
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(item_id): Path<i64>,
) -> Result<Json<CartResponse>> {
    let repo = CartRepository::new(state.pool());
    let now = Utc::now();
    let cart = repo.get_or_create(&identity, now).await?;

    let removed = repo
        .remove_item(cart.id, CartItemId::new(item_id), now)
        .await?;
    if !removed {
        return Err(AppError::NotFound("cart item not found".to_string()));
    }

    Ok(Json(load_cart_response(&state, &identity).await?))
}

/// Remove every line from the caller's cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartResponse>> {
    let repo = CartRepository::new(state.pool());
    let now = Utc::now();
    let cart = repo.get_or_create(&identity, now).await?;
    repo.clear(cart.id, now).await?;

    Ok(Json(load_cart_response(&state, &identity).await?))
}

/// Fold an anonymous session cart into the signed-in caller's cart.
///
/// Called by the frontend right after login. Matching (product, variant)
/// lines have their quantities summed; the session cart is deleted. A
/// missing session cart is not an error - the caller simply gets their own
/// cart back.
#[instrument(skip(state))]
pub async fn merge(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<MergePayload>,
) -> Result<Json<CartResponse>> {
    if identity.user_id().is_none() {
        return Err(AppError::Unauthorized(
            "sign in before merging a session cart".to_string(),
        ));
    }

    let repo = CartRepository::new(state.pool());
    let now = Utc::now();
    let dest = repo.get_or_create(&identity, now).await?;

    let source_token = SessionToken::new(payload.session_token);
    if let Some(source) = repo.get_by_session(&source_token).await? {
        repo.merge(source.id, dest.id, now).await?;
    }

    Ok(Json(load_cart_response(&state, &identity).await?))
}
