//! Status enums for orders, payments, and provider transactions.
//!
//! Orders carry two independent status axes: a fulfillment axis
//! ([`OrderStatus`]) and a payment axis ([`PaymentStatus`]). The payment
//! adapters advance both together on a successful confirmation; everything
//! else moves them independently.
//!
//! All enums round-trip through their `snake_case` string form, which is
//! also how they are stored in `TEXT` columns.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// The happy path is a forward chain; `cancelled`, `refunded`, and
/// `returned` are administrative side-exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentPending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
    Returned,
}

impl OrderStatus {
    /// Whether this status is terminal (no further transitions allowed).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded | Self::Returned)
    }

    /// The next status on the forward fulfillment chain, if any.
    #[must_use]
    pub const fn next_in_chain(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::PaymentPending),
            Self::PaymentPending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered
            | Self::Cancelled
            | Self::Refunded
            | Self::Returned => None,
        }
    }

    /// Whether a transition from `self` to `target` is legal.
    ///
    /// Forward moves follow the chain one step at a time, except that a
    /// paid-in-full confirmation may jump `pending -> confirmed` directly
    /// (a synchronous capture can land before the initiate step is
    /// recorded). Side-exits are reachable from any non-terminal state;
    /// `returned` is additionally reachable from `delivered`.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        if *self == target {
            return false;
        }
        if self.is_terminal() {
            return false;
        }
        match target {
            Self::Cancelled | Self::Refunded => *self != Self::Delivered,
            Self::Returned => true,
            Self::Confirmed => matches!(self, Self::Pending | Self::PaymentPending),
            _ => self.next_in_chain() == Some(target),
        }
    }

    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentPending => "payment_pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Returned => "returned",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "payment_pending" => Ok(Self::PaymentPending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "returned" => Ok(Self::Returned),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Order payment status, independent of the fulfillment axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Whether a transition from `self` to `target` is legal.
    ///
    /// `pending` may become `paid` or `failed`; `paid` may be refunded in
    /// full or in part. A failed payment attempt deliberately leaves the
    /// order's axis at `pending` so the customer can retry, so `failed`
    /// only appears through administrative action.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match (self, target) {
            (Self::Pending, Self::Paid | Self::Failed) => true,
            (Self::Paid, Self::Refunded | Self::PartiallyRefunded) => true,
            (Self::PartiallyRefunded, Self::Refunded) => true,
            _ => false,
        }
    }

    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// How the customer chose to pay for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Mpesa,
    Paypal,
    Card,
    Cod,
}

impl PaymentMethod {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mpesa => "mpesa",
            Self::Paypal => "paypal",
            Self::Card => "card",
            Self::Cod => "cod",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpesa" => Ok(Self::Mpesa),
            "paypal" => Ok(Self::Paypal),
            "card" => Ok(Self::Card),
            "cod" => Ok(Self::Cod),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// How an order is delivered to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Door-to-door delivery with a flat per-currency fee.
    #[default]
    Home,
    /// Collection from a pickup station with a station-specific fee.
    Pickup,
}

impl DeliveryType {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Pickup => "pickup",
        }
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "pickup" => Ok(Self::Pickup),
            _ => Err(format!("invalid delivery type: {s}")),
        }
    }
}

/// How a coupon's discount is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage of the order subtotal.
    Percent,
    /// Fixed dollar amount; applies only to USD orders.
    FixedUsd,
    /// Fixed shilling amount; applies only to KES orders.
    FixedKes,
}

impl DiscountType {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::FixedUsd => "fixed_usd",
            Self::FixedKes => "fixed_kes",
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(Self::Percent),
            "fixed_usd" => Ok(Self::FixedUsd),
            "fixed_kes" => Ok(Self::FixedKes),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

/// Status of a single M-Pesa STK push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MpesaTxStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl MpesaTxStatus {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MpesaTxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MpesaTxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid mpesa transaction status: {s}")),
        }
    }
}

/// Status of a single PayPal order/capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayPalTxStatus {
    #[default]
    Created,
    Approved,
    Completed,
    Failed,
}

impl PayPalTxStatus {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PayPalTxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PayPalTxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid paypal transaction status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain_single_steps() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::PaymentPending));
        assert!(OrderStatus::PaymentPending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Delivered));

        // No skipping ahead on the fulfillment chain
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_pending_can_jump_to_confirmed() {
        // A synchronous capture may confirm before payment_pending is recorded
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_terminal_states_are_dead_ends() {
        for terminal in [
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::Returned,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(OrderStatus::Pending));
            assert!(!terminal.can_transition_to(OrderStatus::Confirmed));
        }
    }

    #[test]
    fn test_side_exits() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Refunded));
        // Returns are allowed even after delivery; cancellation is not
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Returned));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_self_transition_is_rejected() {
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Paid));
    }

    #[test]
    fn test_payment_axis_transitions() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::Refunded));
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::PartiallyRefunded));

        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn test_status_string_roundtrips() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::PaymentPending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::Returned,
        ] {
            let parsed: OrderStatus = status.as_str().parse().expect("parse");
            assert_eq!(parsed, status);
        }

        assert!("unknown".parse::<OrderStatus>().is_err());
        assert!("".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_method_and_delivery_roundtrips() {
        for method in [
            PaymentMethod::Mpesa,
            PaymentMethod::Paypal,
            PaymentMethod::Card,
            PaymentMethod::Cod,
        ] {
            let parsed: PaymentMethod = method.as_str().parse().expect("parse");
            assert_eq!(parsed, method);
        }
        for delivery in [DeliveryType::Home, DeliveryType::Pickup] {
            let parsed: DeliveryType = delivery.as_str().parse().expect("parse");
            assert_eq!(parsed, delivery);
        }
        for discount in [
            DiscountType::Percent,
            DiscountType::FixedUsd,
            DiscountType::FixedKes,
        ] {
            let parsed: DiscountType = discount.as_str().parse().expect("parse");
            assert_eq!(parsed, discount);
        }
    }
}
