//! M-Pesa STK push client (Daraja API).
//!
//! Initiation is a two-call sequence: an OAuth token fetch (HTTP Basic with
//! the consumer key/secret) followed by the STK push itself. Confirmation
//! arrives later as an unauthenticated server-to-server webhook; the only
//! thing tying a callback to an attempt is the `CheckoutRequestID` we stored
//! when the push was issued, so the payload is treated strictly as untrusted
//! input matched by that id.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use duka_core::Currency;

use super::{PaymentError, truncate_detail};
use crate::config::MpesaConfig;

/// Provider request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successfully issued STK push.
#[derive(Debug, Clone)]
pub struct StkPush {
    /// Provider-assigned id; the key the confirmation callback will carry.
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    /// Text the provider suggests showing the customer.
    pub customer_message: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct StkPushResponse {
    #[serde(rename = "ResponseCode", default)]
    response_code: Option<String>,
    #[serde(rename = "CheckoutRequestID", default)]
    checkout_request_id: Option<String>,
    #[serde(rename = "MerchantRequestID", default)]
    merchant_request_id: Option<String>,
    #[serde(rename = "CustomerMessage", default)]
    customer_message: Option<String>,
}

/// The `Body.stkCallback` payload of a confirmation webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata", default)]
    metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallbackItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CallbackEnvelope {
    #[serde(rename = "Body")]
    body: CallbackBody,
}

#[derive(Deserialize)]
struct CallbackBody {
    #[serde(rename = "stkCallback")]
    stk_callback: StkCallback,
}

impl StkCallback {
    /// A result code of zero signals a completed payment.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// The M-Pesa receipt number from the callback metadata, if present.
    #[must_use]
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == "MpesaReceiptNumber")
            .and_then(|item| item.value.as_ref())
            .and_then(|value| value.as_str().map(ToString::to_string))
    }
}

/// Parse a webhook payload into its callback, keeping the raw value intact
/// for persistence.
///
/// # Errors
///
/// Returns the deserialization error if the payload is not shaped like an
/// STK callback.
pub fn parse_callback(payload: &serde_json::Value) -> Result<StkCallback, serde_json::Error> {
    let envelope: CallbackEnvelope = serde_json::from_value(payload.clone())?;
    Ok(envelope.body.stk_callback)
}

/// Build the STK push password: base64 of shortcode, passkey, and timestamp.
#[must_use]
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Express an amount as the whole shillings the provider requires.
///
/// # Errors
///
/// Returns `PaymentError::AmountOutOfRange` if the rounded amount does not
/// fit an `i64`.
pub fn whole_kes(amount: Decimal) -> Result<i64, PaymentError> {
    Currency::KES
        .round(amount)
        .to_i64()
        .ok_or(PaymentError::AmountOutOfRange(amount))
}

/// M-Pesa API client.
#[derive(Clone)]
pub struct MpesaClient {
    http: reqwest::Client,
    config: MpesaConfig,
}

impl MpesaClient {
    /// Create a new M-Pesa client with the provider timeout applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: MpesaConfig) -> Result<Self, reqwest::Error> {
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
    /// response - the caller retries, nothing is swallowed.
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String, PaymentError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(
                &self.config.consumer_key,
                Some(self.config.consumer_secret.expose_secret()),
            )
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

    /// Issue an STK push for the given whole-shilling amount.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Auth` if the token fetch fails,
    /// `PaymentError::Rejected` if the provider declines the push,
    /// `PaymentError::Timeout`/`Http`/`MalformedResponse` for transport
    /// problems.
    #[instrument(skip(self, phone), fields(account_reference = %account_reference, amount = amount))]
    pub async fn initiate(
        &self,
        amount: i64,
        phone: &str,
        account_reference: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<StkPush, PaymentError> {
        let token = self.access_token().await?;

        let timestamp = now.format("%Y%m%d%H%M%S").to_string();
        let password = stk_password(
            &self.config.shortcode,
            self.config.passkey.expose_secret(),
            &timestamp,
        );

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.shortcode,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": phone,
            "PartyB": self.config.shortcode,
            "PhoneNumber": phone,
            "CallBackURL": self.config.callback_url,
            "AccountReference": account_reference,
            "TransactionDesc": description,
        });

        let response = self
            .http
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.config.base_url
            ))
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

        let parsed: StkPushResponse = serde_json::from_value(body.clone())
            .map_err(|e| PaymentError::MalformedResponse(e.to_string()))?;

        if parsed.response_code.as_deref() != Some("0") {
            return Err(PaymentError::Rejected {
                detail: truncate_detail(&body.to_string()),
            });
        }

        let checkout_request_id = parsed.checkout_request_id.ok_or_else(|| {
            PaymentError::MalformedResponse("push accepted without a CheckoutRequestID".to_string())
        })?;

        Ok(StkPush {
            checkout_request_id,
            merchant_request_id: parsed.merchant_request_id,
            customer_message: parsed.customer_message,
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
    fn test_stk_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "passkey", "20260806120000");
        let decoded = BASE64.decode(password).expect("valid base64");
        assert_eq!(decoded, b"174379passkey20260806120000");
    }

    #[test]
    fn test_whole_kes_rounds_half_up() {
        assert_eq!(whole_kes(dec("34840.00")).expect("fits"), 34840);
        assert_eq!(whole_kes(dec("129.5")).expect("fits"), 130);
        assert_eq!(whole_kes(dec("129.4")).expect("fits"), 129);
    }

    #[test]
    fn test_parse_success_callback_with_receipt() {
        let payload = serde_json::json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            {"Name": "Amount", "Value": 1.00},
                            {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                            {"Name": "TransactionDate", "Value": 20191219102115u64},
                            {"Name": "PhoneNumber", "Value": 254708374149u64}
                        ]
                    }
                }
            }
        });

        let callback = parse_callback(&payload).expect("parses");
        assert!(callback.is_success());
        assert_eq!(callback.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(callback.receipt_number().as_deref(), Some("NLJ7RT61SV"));
    }

    #[test]
    fn test_parse_failure_callback_without_metadata() {
        let payload = serde_json::json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user."
                }
            }
        });

        let callback = parse_callback(&payload).expect("parses");
        assert!(!callback.is_success());
        assert_eq!(callback.receipt_number(), None);
        assert_eq!(callback.result_desc, "Request cancelled by user.");
    }

    #[test]
    fn test_parse_rejects_unrelated_payload() {
        let payload = serde_json::json!({"hello": "world"});
        assert!(parse_callback(&payload).is_err());
    }
}
