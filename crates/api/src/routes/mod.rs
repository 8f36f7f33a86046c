//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (DB ping)
//!
//! # Cart
//! GET    /api/cart                      - Get cart (live prices, both currencies)
//! POST   /api/cart/items                - Add item (merges duplicate lines)
//! PATCH  /api/cart/items/{id}           - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{id}           - Remove item
//! DELETE /api/cart                      - Clear cart
//! POST   /api/cart/merge                - Fold session cart into user cart
//!
//! # Checkout & Orders
//! POST /api/orders                      - Create order from cart
//! GET  /api/orders                      - List caller's orders
//! GET  /api/orders/{id}                 - Get order with items
//!
//! # Coupons
//! POST /api/coupons/validate            - Preview a code (no usage increment)
//!
//! # Payments - M-Pesa
//! POST /api/payments/mpesa/initiate     - STK push for an order
//! POST /api/payments/mpesa/callback     - Provider webhook (unauthenticated)
//! GET  /api/payments/mpesa/status/{id}  - Status poll
//!
//! # Payments - PayPal
//! POST /api/payments/paypal/create      - Create provider order
//! POST /api/payments/paypal/capture     - Capture after approval
//! ```

pub mod cart;
pub mod coupons;
pub mod orders;
pub mod payments;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            axum::routing::patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/merge", post(cart::merge))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).get(orders::list))
        .route("/{id}", get(orders::show))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new().route("/validate", post(coupons::validate))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/coupons", coupon_routes())
        .nest("/api/payments", payments::routes())
}
