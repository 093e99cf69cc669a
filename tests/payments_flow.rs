use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use biashara_hub::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    error::AppError,
    dto::{
        cart::AddCartItemRequest,
        payments::{CreatePaymentRequest, UpdatePaymentStatusRequest},
        service_requests::{CreateServiceRequest, PaymentDetails},
    },
    jobs::confirm_due_payments,
    middleware::auth::AuthUser,
    services::{cart_service, payment_service, service_request_service},
    state::AppState,
    types::{CatalogKind, Priority, Role},
};

fn mpesa_request(amount: i64) -> CreatePaymentRequest {
    CreatePaymentRequest {
        service_type: "KRA".into(),
        payment_method: "m-pesa".into(),
        amount,
        phone_number: Some("254712345678".into()),
        description: Some("Tax returns filing".into()),
        card_number: None,
        bank_name: None,
        bank_reference: None,
        metadata: None,
    }
}

#[tokio::test]
async fn mpesa_payment_is_confirmed_by_the_job() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;

    let created = payment_service::create_payment(&state, &client, mpesa_request(3_000))
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(created.status, "pending");
    assert_eq!(created.payment_method, "mpesa");
    assert_eq!(created.service_type, "kra_services");
    assert_eq!(created.mpesa_number.as_deref(), Some("0712345678"));
    assert!(created.transaction_id.starts_with("TXN"));
    assert!(created.invoice_number.starts_with("INV-"));

    confirm_due_payments(&state.pool).await?;

    let confirmed = payment_service::get_payment(&state, &client, created.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(confirmed.status, "successful");
    assert!(confirmed.paid_at.is_some());
    let receipt = confirmed.mpesa_receipt.expect("receipt");
    assert!(receipt.starts_with("MP"));
    assert_eq!(receipt.len(), 10);

    // A second sweep has nothing left to do for this payment.
    confirm_due_payments(&state.pool).await?;
    let again = payment_service::get_payment(&state, &client, created.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(again.mpesa_receipt.as_deref(), Some(receipt.as_str()));

    let stats = payment_service::payment_stats(&state, &client)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.total_payments, 1);
    assert_eq!(stats.total_paid, 3_000);

    Ok(())
}

#[tokio::test]
async fn mpesa_payment_waits_out_the_confirmation_delay() -> anyhow::Result<()> {
    let Some(state) = setup_state_with_delay(3_600).await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;

    let created = payment_service::create_payment(&state, &client, mpesa_request(2_500))
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(created.status, "pending");

    confirm_due_payments(&state.pool).await?;
    let waiting = payment_service::get_payment(&state, &client, created.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(waiting.status, "pending");
    assert!(waiting.paid_at.is_none());
    assert!(waiting.mpesa_receipt.is_none());

    sqlx::query("UPDATE payments SET confirm_after = now() - interval '1 second' WHERE id = $1")
        .bind(created.id)
        .execute(&state.pool)
        .await?;
    confirm_due_payments(&state.pool).await?;

    let confirmed = payment_service::get_payment(&state, &client, created.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(confirmed.status, "successful");
    assert!(confirmed.paid_at.is_some());
    assert!(confirmed.mpesa_receipt.is_some_and(|receipt| receipt.starts_with("MP")));

    Ok(())
}

#[tokio::test]
async fn payment_validation_and_status_transitions() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;

    assert!(
        payment_service::create_payment(&state, &client, mpesa_request(0))
            .await
            .is_err()
    );
    let mut bad_phone = mpesa_request(500);
    bad_phone.phone_number = Some("0812345678".into());
    assert!(
        payment_service::create_payment(&state, &client, bad_phone)
            .await
            .is_err()
    );
    let mut bad_method = mpesa_request(500);
    bad_method.payment_method = "cash".into();
    assert!(
        payment_service::create_payment(&state, &client, bad_method)
            .await
            .is_err()
    );

    let bank = payment_service::create_payment(
        &state,
        &client,
        CreatePaymentRequest {
            service_type: "data-analytics".into(),
            payment_method: "bank".into(),
            amount: 15_000,
            phone_number: None,
            description: None,
            card_number: None,
            bank_name: Some("KCB".into()),
            bank_reference: None,
            metadata: None,
        },
    )
    .await?
    .data
    .expect("payment")
    .payment;
    assert_eq!(bank.status, "pending");

    let done = payment_service::update_payment_status(
        &state,
        &client,
        bank.id,
        UpdatePaymentStatusRequest {
            status: "successful".into(),
            transaction_reference: Some("BT-001".into()),
            failure_reason: None,
        },
    )
    .await?
    .data
    .expect("payment")
    .payment;
    assert_eq!(done.status, "successful");
    assert_eq!(done.bank_reference.as_deref(), Some("BT-001"));

    // Successful payments can only be refunded.
    let back_to_pending = payment_service::update_payment_status(
        &state,
        &client,
        bank.id,
        UpdatePaymentStatusRequest {
            status: "pending".into(),
            transaction_reference: None,
            failure_reason: None,
        },
    )
    .await;
    assert!(back_to_pending.is_err());

    let refunded = payment_service::update_payment_status(
        &state,
        &client,
        bank.id,
        UpdatePaymentStatusRequest {
            status: "refunded".into(),
            transaction_reference: None,
            failure_reason: None,
        },
    )
    .await?
    .data
    .expect("payment")
    .payment;
    assert_eq!(refunded.status, "refunded");
    assert!(refunded.refunded_at.is_some());

    // Other users see 404.
    let stranger = create_user(&state, Role::Client).await?;
    assert!(payment_service::get_payment(&state, &stranger, bank.id).await.is_err());

    Ok(())
}

#[tokio::test]
async fn mpesa_service_request_is_paid_once_confirmed() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;
    let request_id = checkout(&state, &client).await?;

    let paid = service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Mpesa {
            phone_number: "0712345678".into(),
        },
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(paid.payment.status, "pending");
    assert_eq!(paid.request.status, "pending_payment");
    assert_eq!(paid.payment.service_request_id, Some(request_id));

    // The owner cannot settle a request's payment directly.
    let direct = payment_service::update_payment_status(
        &state,
        &client,
        paid.payment.id,
        UpdatePaymentStatusRequest {
            status: "successful".into(),
            transaction_reference: None,
            failure_reason: None,
        },
    )
    .await;
    assert!(direct.is_err());

    confirm_due_payments(&state.pool).await?;

    let after = service_request_service::get_my_request(&state, &client, request_id)
        .await?
        .data
        .expect("request");
    assert_eq!(after.request.status, "paid_pending_processing");
    let payment = payment_service::get_payment(&state, &client, paid.payment.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(payment.status, "successful");

    // A refund cannot be recorded behind the request's back either.
    let refund = payment_service::update_payment_status(
        &state,
        &client,
        paid.payment.id,
        UpdatePaymentStatusRequest {
            status: "refunded".into(),
            transaction_reference: None,
            failure_reason: None,
        },
    )
    .await;
    assert!(refund.is_err());

    Ok(())
}

#[tokio::test]
async fn request_with_a_successful_payment_cannot_be_paid_again() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;
    let request_id = checkout(&state, &client).await?;

    service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Mpesa {
            phone_number: "0712345678".into(),
        },
    )
    .await?;
    confirm_due_payments(&state.pool).await?;

    // Force the request back to awaiting payment while its payment stays successful.
    sqlx::query("UPDATE service_requests SET status = 'pending_payment' WHERE id = $1")
        .bind(request_id)
        .execute(&state.pool)
        .await?;

    let second = service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Mpesa {
            phone_number: "0712345678".into(),
        },
    )
    .await;
    assert!(second.is_err());

    let (payments,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE service_request_id = $1")
            .bind(request_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(payments, 1);

    Ok(())
}

#[tokio::test]
async fn cancel_waits_for_a_confirmation_holding_the_payment_lock() -> anyhow::Result<()> {
    // Far-off due time so only the transaction below settles the payment.
    let Some(state) = setup_state_with_delay(3600).await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;
    let request_id = checkout(&state, &client).await?;
    let paid = service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Mpesa {
            phone_number: "0712345678".into(),
        },
    )
    .await?
    .data
    .expect("payment");

    // Same order as the confirmation job: payment row first, then the request.
    let mut confirming = state.pool.begin().await?;
    sqlx::query("SELECT id FROM payments WHERE id = $1 FOR UPDATE")
        .bind(paid.payment.id)
        .execute(&mut *confirming)
        .await?;

    let cancel = tokio::spawn({
        let state = state.clone();
        let client = client.clone();
        async move { service_request_service::cancel_request(&state, &client, request_id).await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    sqlx::query("UPDATE payments SET status = 'successful', paid_at = now() WHERE id = $1")
        .bind(paid.payment.id)
        .execute(&mut *confirming)
        .await?;
    sqlx::query("UPDATE service_requests SET status = 'paid_pending_processing' WHERE id = $1")
        .bind(request_id)
        .execute(&mut *confirming)
        .await?;
    confirming.commit().await?;

    let cancelled = cancel.await?;
    assert!(matches!(cancelled, Err(AppError::BadRequest(_))));

    let after = service_request_service::get_my_request(&state, &client, request_id)
        .await?
        .data
        .expect("request");
    assert_eq!(after.request.status, "paid_pending_processing");
    let payment = payment_service::get_payment(&state, &client, paid.payment.id)
        .await?
        .data
        .expect("payment")
        .payment;
    assert_eq!(payment.status, "successful");

    Ok(())
}

async fn checkout(state: &AppState, client: &AuthUser) -> anyhow::Result<Uuid> {
    cart_service::add_item(
        state,
        client,
        CatalogKind::Business,
        AddCartItemRequest {
            service_id: "kra-pin-registration".into(),
            quantity: 1,
            custom_price: None,
        },
    )
    .await?;
    let created = service_request_service::create_request(
        state,
        client,
        CreateServiceRequest {
            catalog: CatalogKind::Business,
            full_name: "Jane Wanjiku".into(),
            email: "jane@example.com".into(),
            phone: "0712345678".into(),
            company_name: None,
            kra_pin: None,
            notes: None,
            priority: Priority::Standard,
        },
    )
    .await?
    .data
    .expect("created");
    Ok(created.request.id)
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Due immediately, so the job picks payments up without waiting.
    setup_state_with_delay(0).await
}

async fn setup_state_with_delay(delay_secs: i64) -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run payment flow tests.");
            return Ok(None);
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let mut config = AppConfig::for_tests(database_url);
    config.mpesa_confirm_delay_secs = delay_secs;
    Ok(Some(AppState::new(pool, config)))
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role)
        VALUES ($1, $2, 'not-a-real-hash', 'Test', 'User', $3)
        "#,
    )
    .bind(id)
    .bind(format!("{}-{id}@example.com", role.as_str()))
    .bind(role.as_str())
    .execute(&state.pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role,
        issued_at: Utc::now(),
    })
}
