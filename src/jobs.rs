use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    services::notification_service::{Topic, notify},
    state::AppState,
};

#[derive(Debug, sqlx::FromRow)]
struct ConfirmedPayment {
    id: Uuid,
    user_id: Uuid,
    service_request_id: Option<Uuid>,
    transaction_id: String,
    amount: i64,
    request_number: Option<String>,
}

/// Marks every M-Pesa payment whose `confirm_after` has passed as successful,
/// moving any linked request out of `pending_payment` in the same statement.
///
/// Rows are claimed with `FOR UPDATE SKIP LOCKED`, so concurrent workers never
/// confirm the same payment twice. Returns the number of payments confirmed.
pub async fn confirm_due_payments(pool: &DbPool) -> AppResult<u64> {
    let confirmed: Vec<ConfirmedPayment> = sqlx::query_as(
        r#"
        WITH due AS (
            SELECT id FROM payments
            WHERE status = 'pending'
              AND payment_method = 'mpesa'
              AND confirm_after IS NOT NULL
              AND confirm_after <= now()
            FOR UPDATE SKIP LOCKED
        ),
        confirmed AS (
            UPDATE payments
            SET status = 'successful',
                paid_at = now(),
                confirm_after = NULL,
                updated_at = now(),
                mpesa_receipt = COALESCE(
                    mpesa_receipt,
                    'MP' || upper(substr(md5(random()::text || id::text), 1, 8))
                )
            WHERE id IN (SELECT id FROM due)
            RETURNING id, user_id, service_request_id, transaction_id, amount
        ),
        paid AS (
            UPDATE service_requests sr
            SET status = 'paid_pending_processing', updated_at = now()
            FROM confirmed c
            WHERE sr.id = c.service_request_id AND sr.status = 'pending_payment'
            RETURNING sr.id, sr.request_number
        )
        SELECT c.id, c.user_id, c.service_request_id, c.transaction_id, c.amount,
               p.request_number
        FROM confirmed c
        LEFT JOIN paid p ON p.id = c.service_request_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    for payment in &confirmed {
        tracing::info!(payment_id = %payment.id, amount = payment.amount, "mpesa payment confirmed");
        notify(
            pool,
            payment.user_id,
            Topic::Payment,
            "payment",
            "Payment successful",
            &format!(
                "Your M-Pesa payment {} of KES {} was confirmed.",
                payment.transaction_id, payment.amount
            ),
        )
        .await;
        if let (Some(request_id), Some(number)) = (payment.service_request_id, &payment.request_number) {
            tracing::info!(%request_id, "service request paid");
            notify(
                pool,
                payment.user_id,
                Topic::Service,
                "service_request",
                "Payment received",
                &format!("Payment for request {number} was received. We will start processing it shortly."),
            )
            .await;
        }
    }

    Ok(confirmed.len() as u64)
}

/// Runs [`confirm_due_payments`] on a fixed interval until the runtime shuts down.
pub fn spawn_confirmation_worker(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match confirm_due_payments(&state.pool).await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "confirmation sweep finished"),
                Err(err) => tracing::error!(error = %err, "confirmation sweep failed"),
            }
        }
    })
}
