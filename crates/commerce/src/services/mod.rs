//! Business logic services.
//!
//! Each service wraps the repositories with the domain rules: the cart
//! service owns merge-on-login, the checkout service owns the one-transaction
//! order commit, the allocation module owns the waterfall ledger decrement,
//! and the payment service owns the verification state machine.

pub mod allocation;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payments;

pub use cart::CartService;
pub use checkout::{CheckoutError, CheckoutService};
pub use orders::OrderService;
pub use payments::{PaymentService, ReviewDecision, WebhookOutcome};
