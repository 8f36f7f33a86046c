//! Payment route handlers, one module per provider.

pub mod mpesa;
pub mod paypal;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the payment routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // M-Pesa push flow
        .route("/mpesa/initiate", post(mpesa::initiate))
        .route("/mpesa/callback", post(mpesa::callback))
        .route("/mpesa/status/{order_id}", get(mpesa::status))
        // PayPal redirect flow
        .route("/paypal/create", post(paypal::create))
        .route("/paypal/capture", post(paypal::capture))
}
