//! Order and payment state machines.
//!
//! Statuses only move forward. The transition tables live here, next to the
//! enums, so every caller shares one definition of what is legal; the
//! commerce crate applies them inside database transactions.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// ```text
/// PendingPayment -> AwaitingVerification -> Paid -> Shipped -> Delivered
///        |                  |                ^
///        |                  +----------------+
///        +--------------------> Paid   (gateway confirms directly)
///
/// Cancelled is reachable from PendingPayment and AwaitingVerification.
/// Delivered and Cancelled are terminal.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, no confirmed payment yet.
    #[default]
    PendingPayment,
    /// A manual proof of payment was uploaded and awaits admin review.
    AwaitingVerification,
    /// Payment confirmed (by gateway or by admin approval).
    Paid,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Abandoned or rejected. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Whether the state machine defines no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Exhaustive over both states; returns/refunds are out of scope, so
    /// terminal states have no successors.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (
                Self::PendingPayment,
                Self::AwaitingVerification | Self::Paid | Self::Cancelled,
            )
            | (Self::AwaitingVerification, Self::Paid | Self::Cancelled)
            | (Self::Paid, Self::Shipped)
            | (Self::Shipped, Self::Delivered) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingPayment => "pending_payment",
            Self::AwaitingVerification => "awaiting_verification",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "awaiting_verification" => Ok(Self::AwaitingVerification),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Status of a single payment attempt.
///
/// One order may accumulate several attempts (a declined card followed by a
/// successful one); each attempt has its own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting gateway confirmation or admin verification.
    #[default]
    Pending,
    /// Confirmed. Terminal.
    Completed,
    /// Declined, rejected, or errored. Terminal.
    Failed,
}

impl PaymentStatus {
    /// Whether this attempt can still change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How a payment attempt is settled.
///
/// A closed set, exhaustively matched wherever behavior differs per method;
/// adding a method is a compile-time event, not a stringly-typed branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card charge through the external gateway; confirmed by webhook.
    Card,
    /// Bank QR transfer; customer uploads a proof, admin verifies it.
    QrTransfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::QrTransfer => write!(f, "qr_transfer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        use OrderStatus::{AwaitingVerification, Delivered, Paid, PendingPayment, Shipped};

        assert!(PendingPayment.can_transition_to(AwaitingVerification));
        assert!(AwaitingVerification.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn gateway_confirmation_bypasses_verification() {
        assert!(OrderStatus::PendingPayment.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn cancellation_is_only_legal_before_payment() {
        use OrderStatus::{
            AwaitingVerification, Cancelled, Delivered, Paid, PendingPayment, Shipped,
        };

        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(AwaitingVerification.can_transition_to(Cancelled));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        use OrderStatus::{
            AwaitingVerification, Cancelled, Delivered, Paid, PendingPayment, Shipped,
        };

        for terminal in [Delivered, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [
                PendingPayment,
                AwaitingVerification,
                Paid,
                Shipped,
                Delivered,
                Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn statuses_never_move_backward() {
        use OrderStatus::{AwaitingVerification, Paid, PendingPayment, Shipped};

        assert!(!AwaitingVerification.can_transition_to(PendingPayment));
        assert!(!Paid.can_transition_to(PendingPayment));
        assert!(!Paid.can_transition_to(AwaitingVerification));
        assert!(!Shipped.can_transition_to(Paid));
    }

    #[test]
    fn payment_attempts_terminate() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn order_status_round_trips_through_strings() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::AwaitingVerification,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().expect("round trip");
            assert_eq!(parsed, status);
        }
    }
}
