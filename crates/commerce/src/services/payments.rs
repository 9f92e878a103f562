//! Payment lifecycle: attempt creation, proof upload, admin verification,
//! and gateway webhook handling.
//!
//! Every transition that marks an order paid (or cancelled) updates the
//! payment and the order in one transaction under row locks - a half-applied
//! pair must never be observable. The webhook path is idempotent under
//! at-least-once delivery: a payment that already left `pending` is a no-op.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use altiplano_core::{
    CurrencyCode, OrderId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus, Price, UserId,
};

use crate::db::{self, OrderRepository, PaymentRepository, RepositoryError};
use crate::error::AppError;
use crate::gateway::{ChargeCorrelation, GatewayClient, GatewayError, GatewayEvent, GatewayEventType};
use crate::models::payment::{CreatedPayment, Payment};

/// Admin verdict on a manually verified payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// What a webhook delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event advanced a payment (and possibly its order).
    Processed,
    /// Duplicate delivery; the payment had already left `pending`. Not an
    /// error - the gateway's retry should see success.
    AlreadyProcessed,
}

/// Payment state machine operations.
pub struct PaymentService<'a> {
    pool: &'a PgPool,
    gateway: &'a GatewayClient,
    currency: CurrencyCode,
    lock_timeout_ms: u64,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        gateway: &'a GatewayClient,
        currency: CurrencyCode,
        lock_timeout_ms: u64,
    ) -> Self {
        Self {
            pool,
            gateway,
            currency,
            lock_timeout_ms,
        }
    }

    /// Start a payment attempt against an order.
    ///
    /// The amount is copied from the order total, never from client input.
    /// Card attempts open a charge intent at the gateway and hand the client
    /// secret back; QR transfers just record the pending attempt.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound`/`Forbidden` for unknown or foreign
    /// orders, `AppError::BadRequest` when the order is past awaiting
    /// payment, `AppError::Gateway` when the gateway refuses the charge (the
    /// attempt is marked failed first).
    #[instrument(skip(self), fields(order_id = %order_id, method = %method))]
    pub async fn create(
        &self,
        user_id: UserId,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<CreatedPayment, AppError> {
        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if order.user_id != Some(user_id) {
            return Err(AppError::Forbidden("order belongs to another user".to_string()));
        }

        if order.status != OrderStatus::PendingPayment {
            return Err(AppError::BadRequest(format!(
                "order in status {} is not awaiting payment",
                order.status
            )));
        }

        let payments = PaymentRepository::new(self.pool);
        let payment = payments.create(order_id, order.total, method).await?;

        match method {
            PaymentMethod::Card => {
                let amount_minor = Price::new(order.total, self.currency)
                    .minor_units()
                    .ok_or(GatewayError::AmountOutOfRange)?;

                let correlation = ChargeCorrelation {
                    order_id,
                    payment_id: payment.id,
                };

                match self
                    .gateway
                    .create_charge_intent(amount_minor, self.currency.gateway_code(), &correlation)
                    .await
                {
                    Ok(intent) => {
                        let payment = payments
                            .set_gateway_transaction_id(payment.id, &intent.id)
                            .await?;

                        info!(payment_id = %payment.id, transaction_id = %intent.id, "Card payment started");

                        Ok(CreatedPayment {
                            payment,
                            client_secret: Some(intent.client_secret),
                        })
                    }
                    Err(e) => {
                        // The attempt failed before the customer saw a card
                        // form; record it and surface the gateway error.
                        payments.mark_failed(payment.id).await?;
                        Err(e.into())
                    }
                }
            }
            PaymentMethod::QrTransfer => {
                info!(payment_id = %payment.id, "QR transfer payment started");

                Ok(CreatedPayment {
                    payment,
                    client_secret: None,
                })
            }
        }
    }

    /// Attach an uploaded proof-of-payment to a pending QR transfer.
    ///
    /// Flips the order to `awaiting_verification` in the same transaction;
    /// the payment itself stays pending until an admin reviews it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound`/`Forbidden` for unknown or foreign
    /// payments, `AppError::BadRequest` for non-QR methods, settled
    /// attempts, or orders past verification.
    #[instrument(skip(self, proof_reference), fields(payment_id = %payment_id))]
    pub async fn attach_proof(
        &self,
        user_id: UserId,
        payment_id: PaymentId,
        proof_reference: &str,
    ) -> Result<Payment, AppError> {
        if proof_reference.is_empty() {
            return Err(AppError::BadRequest("proof reference is required".to_string()));
        }

        let mut tx = db::begin_with_lock_timeout(self.pool, self.lock_timeout_ms).await?;

        let payment = db::payments::get_for_update(&mut tx, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        let order = db::orders::get_for_update(&mut tx, payment.order_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(RepositoryError::DataCorruption(format!(
                    "payment {payment_id} references missing order"
                )))
            })?;

        if order.user_id != Some(user_id) {
            return Err(AppError::Forbidden("payment belongs to another user".to_string()));
        }

        if payment.method != PaymentMethod::QrTransfer {
            return Err(AppError::BadRequest(
                "only QR transfer payments take a proof upload".to_string(),
            ));
        }

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::BadRequest("payment already settled".to_string()));
        }

        let updated = db::payments::attach_proof(&mut tx, payment_id, proof_reference).await?;

        match order.status {
            OrderStatus::PendingPayment => {
                db::orders::set_status(&mut tx, order.id, OrderStatus::AwaitingVerification)
                    .await?;
            }
            // A second proof upload while already under review is fine.
            OrderStatus::AwaitingVerification => {}
            _ => {
                return Err(AppError::BadRequest(format!(
                    "order in status {} is not awaiting payment",
                    order.status
                )));
            }
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(order_id = %order.id, "Proof of payment attached; order awaiting verification");

        Ok(updated)
    }

    /// Admin verdict on a pending payment.
    ///
    /// Approve: payment `completed`, order `paid`. Reject: payment `failed`,
    /// order `cancelled`. Each pair applies in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown payments and
    /// `AppError::BadRequest` for already-settled attempts or orders that
    /// cannot legally move.
    #[instrument(skip(self, notes), fields(payment_id = %payment_id, ?decision))]
    pub async fn review(
        &self,
        payment_id: PaymentId,
        decision: ReviewDecision,
        notes: Option<&str>,
    ) -> Result<Payment, AppError> {
        let mut tx = db::begin_with_lock_timeout(self.pool, self.lock_timeout_ms).await?;

        let payment = db::payments::get_for_update(&mut tx, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::BadRequest("payment already settled".to_string()));
        }

        let order = db::orders::get_for_update(&mut tx, payment.order_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(RepositoryError::DataCorruption(format!(
                    "payment {payment_id} references missing order"
                )))
            })?;

        let updated = match decision {
            ReviewDecision::Approve => {
                if !order.status.can_transition_to(OrderStatus::Paid) {
                    return Err(AppError::BadRequest(format!(
                        "order in status {} cannot be marked paid",
                        order.status
                    )));
                }

                let payment =
                    db::payments::set_status(&mut tx, payment_id, PaymentStatus::Completed, notes)
                        .await?;
                db::orders::set_status(&mut tx, order.id, OrderStatus::Paid).await?;
                payment
            }
            ReviewDecision::Reject => {
                let payment =
                    db::payments::set_status(&mut tx, payment_id, PaymentStatus::Failed, notes)
                        .await?;
                // Another attempt may have paid the order in the meantime;
                // only cancel when the transition is still legal.
                if order.status.can_transition_to(OrderStatus::Cancelled) {
                    db::orders::set_status(&mut tx, order.id, OrderStatus::Cancelled).await?;
                }
                payment
            }
        };

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(order_id = %order.id, status = ?updated.status, "Payment reviewed");

        Ok(updated)
    }

    /// Apply a verified gateway webhook event.
    ///
    /// Matched to the attempt by gateway transaction id (and cross-checked
    /// against the correlation metadata). Only a still-pending payment is
    /// advanced; anything else is a duplicate delivery and a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when no payment matches the transaction
    /// id - the gateway will retry and eventually alert.
    #[instrument(skip(self, event), fields(event_id = %event.id, transaction_id = %event.transaction_id))]
    pub async fn handle_gateway_event(
        &self,
        event: &GatewayEvent,
    ) -> Result<WebhookOutcome, AppError> {
        let mut tx = db::begin_with_lock_timeout(self.pool, self.lock_timeout_ms).await?;

        let payment =
            db::payments::get_by_gateway_transaction_for_update(&mut tx, &event.transaction_id)
                .await?
                .filter(|p| p.id == event.metadata.payment_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "no payment for gateway transaction {}",
                        event.transaction_id
                    ))
                })?;

        if payment.status != PaymentStatus::Pending {
            info!(payment_id = %payment.id, "Duplicate gateway event ignored");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        match event.event_type {
            GatewayEventType::ChargeSucceeded => {
                let order = db::orders::get_for_update(&mut tx, payment.order_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database(RepositoryError::DataCorruption(format!(
                            "payment {} references missing order",
                            payment.id
                        )))
                    })?;

                db::payments::set_status(&mut tx, payment.id, PaymentStatus::Completed, None)
                    .await?;

                if order.status.can_transition_to(OrderStatus::Paid) {
                    db::orders::set_status(&mut tx, order.id, OrderStatus::Paid).await?;
                } else if order.status != OrderStatus::Paid {
                    warn!(
                        order_id = %order.id,
                        status = %order.status,
                        "Charge succeeded for an order that cannot be marked paid"
                    );
                }

                tx.commit().await.map_err(RepositoryError::from)?;

                info!(payment_id = %payment.id, order_id = %order.id, "Gateway charge confirmed");
            }
            GatewayEventType::ChargeFailed => {
                db::payments::set_status(&mut tx, payment.id, PaymentStatus::Failed, None)
                    .await?;
                tx.commit().await.map_err(RepositoryError::from)?;

                info!(payment_id = %payment.id, "Gateway charge failed");
            }
        }

        Ok(WebhookOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_decision_parses_from_request_bodies() {
        let approve: ReviewDecision = serde_json::from_str(r#""approve""#).expect("valid");
        assert_eq!(approve, ReviewDecision::Approve);

        let reject: ReviewDecision = serde_json::from_str(r#""reject""#).expect("valid");
        assert_eq!(reject, ReviewDecision::Reject);

        assert!(serde_json::from_str::<ReviewDecision>(r#""maybe""#).is_err());
    }

    #[test]
    fn only_pending_payments_are_advanceable() {
        // The webhook duplicate-delivery guard and the admin review guard
        // both reduce to this predicate.
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }
}
