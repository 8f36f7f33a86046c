//! Order route handlers: checkout and order retrieval.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use duka_core::{
    Currency, DeliveryType, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, StationId, VariantId,
};

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::order::{Order, OrderItem};
use crate::services::checkout::{CheckoutRequest, CheckoutService};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    pub pickup_station_id: Option<i64>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_city: String,
    #[serde(default)]
    pub shipping_postal_code: String,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl CheckoutPayload {
    fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::BadRequest("full_name is required".to_string()));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(AppError::BadRequest(
                "a valid email is required".to_string(),
            ));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::BadRequest("phone is required".to_string()));
        }
        Ok(())
    }
}

/// Order item projection.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            product_name: item.product_name.clone(),
            variant_name: item.variant_name.clone(),
            sku: item.sku.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            subtotal: item.subtotal(),
        }
    }
}

/// Full order projection, items included.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub currency: Currency,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub delivery_type: DeliveryType,
    pub pickup_station_id: Option<StationId>,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub mpesa_receipt: Option<String>,
    pub paypal_order_id: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    fn build(order: &Order, items: &[OrderItem]) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            currency: order.currency,
            full_name: order.full_name.clone(),
            email: order.email.clone(),
            phone: order.phone.clone(),
            delivery_type: order.delivery_type,
            pickup_station_id: order.pickup_station_id,
            shipping_address: order.shipping_address.clone(),
            shipping_city: order.shipping_city.clone(),
            shipping_postal_code: order.shipping_postal_code.clone(),
            subtotal: order.subtotal,
            shipping_fee: order.shipping_fee,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            mpesa_receipt: order.mpesa_receipt.clone(),
            paypal_order_id: order.paypal_order_id.clone(),
            notes: order.notes.clone(),
            created_at: order.created_at,
            items: items.iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// Order list projection (no items).
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryResponse {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub currency: Currency,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            currency: order.currency,
            total: order.total,
            created_at: order.created_at,
        }
    }
}

/// Create an order from the caller's cart.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let request = CheckoutRequest {
        full_name: payload.full_name,
        email: payload.email,
        phone: payload.phone,
        payment_method: payload.payment_method,
        currency: payload.currency,
        delivery_type: payload.delivery_type,
        pickup_station_id: payload.pickup_station_id.map(StationId::new),
        shipping_address: payload.shipping_address,
        shipping_city: payload.shipping_city,
        shipping_postal_code: payload.shipping_postal_code,
        coupon_code: payload.coupon_code,
        notes: payload.notes,
    };

    let (order, items) = CheckoutService::new(state.pool())
        .checkout(&identity, request, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::build(&order, &items))))
}

/// List the caller's orders, newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<OrderSummaryResponse>>> {
    let orders = OrderRepository::new(state.pool()).list_for(&identity).await?;
    Ok(Json(orders.iter().map(OrderSummaryResponse::from).collect()))
}

/// Get one of the caller's orders, items included.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_owned(OrderId::new(order_id), &identity)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;
    let items = repo.items_for(order.id).await?;

    Ok(Json(OrderResponse::build(&order, &items)))
}
