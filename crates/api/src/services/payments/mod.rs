//! External payment provider clients.
//!
//! Both providers implement the same two-phase contract - initiate, then
//! confirm - over different shapes: M-Pesa confirms via a server-to-server
//! webhook, PayPal via a client-returns-then-server-captures flow. The
//! clients here only speak HTTP; persistence and order mutation happen in
//! the route handlers, which open their transaction *after* the provider
//! call returns so provider latency never extends a lock's hold time.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::money::MoneyError;

pub mod mpesa;
pub mod paypal;

/// Longest provider payload fragment we surface in errors and logs.
const MAX_DETAIL_LEN: usize = 512;

/// Errors from payment provider interactions.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider's token endpoint rejected us or returned garbage.
    /// Retryable by the caller; never swallowed.
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// The provider did not answer within the request timeout. The order
    /// stays payable; the asynchronous confirmation path remains
    /// authoritative even after a synchronous timeout.
    #[error("provider request timed out")]
    Timeout,

    /// The provider processed the request and said no. The order is left
    /// untouched and stays payable via retry.
    #[error("provider rejected the request: {detail}")]
    Rejected { detail: String },

    /// The provider answered with something we could not interpret.
    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure talking to the provider.
    #[error("provider request failed: {0}")]
    Http(reqwest::Error),

    /// The amount cannot be expressed in the provider's required unit.
    #[error("amount {0} cannot be represented for the provider")]
    AmountOutOfRange(Decimal),

    /// Currency conversion for the provider's unit failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Bound a provider payload for inclusion in an error or log line.
///
/// Raw payloads are persisted in full on the transaction rows; errors only
/// ever carry a bounded fragment.
#[must_use]
pub fn truncate_detail(detail: &str) -> String {
    if detail.len() <= MAX_DETAIL_LEN {
        detail.to_string()
    } else {
        let cut = detail
            .char_indices()
            .take_while(|(i, _)| *i < MAX_DETAIL_LEN)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", detail.get(..cut).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_detail_unchanged() {
        assert_eq!(truncate_detail("error"), "error");
    }

    #[test]
    fn test_truncate_long_detail_bounded() {
        let long = "x".repeat(2048);
        let truncated = truncate_detail(&long);
        assert!(truncated.len() <= MAX_DETAIL_LEN + 3);
        assert!(truncated.ends_with("..."));
    }
}
