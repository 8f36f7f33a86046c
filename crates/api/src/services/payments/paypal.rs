//! PayPal checkout client (Orders v2 API).
//!
//! The redirect flow: create a CAPTURE-intent provider order and send the
//! customer to its approval link; once they return, capture the order
//! server-side. The provider requires decimal-string USD amounts, so
//! shilling-denominated orders are converted through the stored rate table
//! before initiation.

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use duka_core::Currency;

use super::{PaymentError, truncate_detail};
use crate::config::PayPalConfig;

/// Provider request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The provider order status that signals a finished capture.
pub const CAPTURE_COMPLETED: &str = "COMPLETED";

/// A created provider order.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// The provider's order id; the key the capture call will carry.
    pub id: String,
    /// Where to send the customer to approve the payment.
    pub approval_url: Option<String>,
    /// Full provider response, persisted for audit.
    pub raw: serde_json::Value,
}

/// The outcome of a capture call.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    /// Provider order status (`COMPLETED` on success).
    pub status: String,
    /// The capture id, when the provider issued one.
    pub capture_id: Option<String>,
    /// Full provider response, persisted for audit.
    pub raw: serde_json::Value,
}

impl CaptureOutcome {
    /// Whether the capture finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == CAPTURE_COMPLETED
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Format an amount the way the provider's USD fields require.
#[must_use]
pub fn usd_amount_string(amount: Decimal) -> String {
    format!("{:.2}", Currency::USD.round(amount))
}

/// Pull the approval link out of a created order's `links` array.
fn extract_approval_url(body: &serde_json::Value) -> Option<String> {
    body.get("links")?
        .as_array()?
        .iter()
        .find(|link| link.get("rel").and_then(serde_json::Value::as_str) == Some("approve"))
        .and_then(|link| link.get("href").and_then(serde_json::Value::as_str))
        .map(ToString::to_string)
}

/// Pull the capture id out of a capture response.
fn extract_capture_id(body: &serde_json::Value) -> Option<String> {
    body.pointer("/purchase_units/0/payments/captures/0/id")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}

/// PayPal API client.
#[derive(Clone)]
pub struct PayPalClient {
    http: reqwest::Client,
    config: PayPalConfig,
}

impl PayPalClient {
    /// Create a new PayPal client with the provider timeout applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: PayPalConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, config })
    }

    /// Fetch an OAuth access token.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Auth` on a non-2xx or malformed token
    /// response.
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String, PaymentError> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.base_url))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = truncate_detail(&response.text().await.unwrap_or_default());
            return Err(PaymentError::Auth(format!(
                "token endpoint returned {status}: {detail}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Auth(format!("malformed token response: {e}")))?;

        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| PaymentError::Auth("token response carried no access_token".to_string()))
    }

    /// Create a CAPTURE-intent provider order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Auth` if the token fetch fails,
    /// `PaymentError::Rejected` if the provider declines,
    /// `PaymentError::Timeout`/`Http`/`MalformedResponse` for transport
    /// problems.
    #[instrument(skip(self), fields(reference = %reference, amount = %amount))]
    pub async fn create_order(
        &self,
        amount: &str,
        reference: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<CreatedOrder, PaymentError> {
        let token = self.access_token().await?;

        let payload = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": reference,
                "amount": {"currency_code": Currency::USD.code(), "value": amount},
                "description": format!("Order {reference}"),
            }],
            "application_context": {
                "return_url": return_url,
                "cancel_url": cancel_url,
            }
        });

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.config.base_url))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(PaymentError::Rejected {
                detail: truncate_detail(&body.to_string()),
            });
        }

        let id = body
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                PaymentError::MalformedResponse("created order carried no id".to_string())
            })?;

        let approval_url = extract_approval_url(&body);

        Ok(CreatedOrder {
            id,
            approval_url,
            raw: body,
        })
    }

    /// Capture a previously approved provider order.
    ///
    /// Any status other than `COMPLETED` is reported in the outcome for the
    /// caller to surface; the provider response is returned either way so it
    /// can be persisted.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Auth` if the token fetch fails,
    /// `PaymentError::Rejected` on a non-2xx capture response,
    /// `PaymentError::Timeout`/`Http`/`MalformedResponse` for transport
    /// problems.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, paypal_order_id: &str) -> Result<CaptureOutcome, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{paypal_order_id}/capture",
                self.config.base_url
            ))
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(PaymentError::Rejected {
                detail: truncate_detail(&body.to_string()),
            });
        }

        let order_status = body
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let capture_id = extract_capture_id(&body);

        Ok(CaptureOutcome {
            status: order_status,
            capture_id,
            raw: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn test_usd_amount_string_pads_to_two_decimals() {
        assert_eq!(usd_amount_string(dec("268")), "268.00");
        assert_eq!(usd_amount_string(dec("19.9")), "19.90");
        assert_eq!(usd_amount_string(dec("19.999")), "20.00");
    }

    #[test]
    fn test_extract_approval_url() {
        let body = serde_json::json!({
            "id": "5O190127TN364715T",
            "status": "CREATED",
            "links": [
                {"href": "https://api-m.paypal.com/v2/checkout/orders/5O1", "rel": "self", "method": "GET"},
                {"href": "https://www.paypal.com/checkoutnow?token=5O1", "rel": "approve", "method": "GET"}
            ]
        });
        assert_eq!(
            extract_approval_url(&body).as_deref(),
            Some("https://www.paypal.com/checkoutnow?token=5O1")
        );
    }

    #[test]
    fn test_extract_approval_url_missing_links() {
        let body = serde_json::json!({"id": "5O190127TN364715T"});
        assert_eq!(extract_approval_url(&body), None);
    }

    #[test]
    fn test_extract_capture_id() {
        let body = serde_json::json!({
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "purchase_units": [{
                "payments": {
                    "captures": [{"id": "3C679366HH908993F", "status": "COMPLETED"}]
                }
            }]
        });
        assert_eq!(
            extract_capture_id(&body).as_deref(),
            Some("3C679366HH908993F")
        );
    }

    #[test]
    fn test_capture_outcome_completed_check() {
        let completed = CaptureOutcome {
            status: "COMPLETED".to_string(),
            capture_id: Some("3C679366HH908993F".to_string()),
            raw: serde_json::Value::Null,
        };
        assert!(completed.is_completed());

        let declined = CaptureOutcome {
            status: "DECLINED".to_string(),
            capture_id: None,
            raw: serde_json::Value::Null,
        };
        assert!(!declined.is_completed());
    }
}
