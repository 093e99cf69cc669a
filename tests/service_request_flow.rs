use chrono::Utc;
use uuid::Uuid;

use biashara_hub::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        cart::AddCartItemRequest,
        service_requests::{CreateServiceRequest, PaymentDetails, UpdateServiceRequestStatus},
    },
    middleware::auth::AuthUser,
    routes::params::StatusListQuery,
    services::{cart_service, service_request_service},
    state::AppState,
    types::{CatalogKind, Priority, Role},
};

// Cart -> service request -> card payment -> admin processing.
#[tokio::test]
async fn cart_checkout_payment_and_admin_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;

    for service_id in ["kra-pin-registration", "ngo-registration"] {
        cart_service::add_item(
            &state,
            &client,
            CatalogKind::Business,
            AddCartItemRequest {
                service_id: service_id.to_string(),
                quantity: 1,
                custom_price: None,
            },
        )
        .await?;
    }
    let cart = cart_service::get_cart(&state, &client, CatalogKind::Business)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, 51_500);

    let created = service_request_service::create_request(
        &state,
        &client,
        CreateServiceRequest {
            catalog: CatalogKind::Business,
            full_name: "Jane Wanjiku".into(),
            email: "jane@example.com".into(),
            phone: "+254712345678".into(),
            company_name: Some("Wanjiku Ventures".into()),
            kra_pin: None,
            notes: None,
            priority: Priority::Express,
        },
    )
    .await?
    .data
    .expect("created request");
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.request.subtotal, 51_500);
    assert_eq!(created.request.priority_fee, 15_450);
    assert_eq!(created.request.total_amount, 66_950);
    assert_eq!(created.request.status, "pending_payment");
    assert!(created.request.request_number.starts_with("SR-"));

    // The cart is emptied by checkout.
    let cart = cart_service::get_cart(&state, &client, CatalogKind::Business)
        .await?
        .data
        .expect("cart");
    assert!(cart.items.is_empty());

    let request_id = created.request.id;
    let paid = service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Card {
            card_number: "4111 1111 1111 1111".into(),
            card_holder: "Jane Wanjiku".into(),
            expiry: "12/99".into(),
            cvv: "123".into(),
        },
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(paid.payment.amount, 66_950);
    assert_eq!(paid.payment.status, "successful");
    assert_eq!(paid.payment.card_last4.as_deref(), Some("1111"));
    assert_eq!(paid.request.status, "paid_pending_processing");
    assert_eq!(paid.request.payment_id, Some(paid.payment.id));

    // Paying twice is rejected.
    let again = service_request_service::pay_request(
        &state,
        &client,
        request_id,
        PaymentDetails::Mpesa {
            phone_number: "0712345678".into(),
        },
    )
    .await;
    assert!(again.is_err());

    // Completing straight from paid skips processing and is refused.
    let skipped = service_request_service::update_request_status(
        &state,
        &admin,
        request_id,
        UpdateServiceRequestStatus {
            status: "completed".into(),
        },
    )
    .await;
    assert!(skipped.is_err());

    for status in ["processing", "completed"] {
        let updated = service_request_service::update_request_status(
            &state,
            &admin,
            request_id,
            UpdateServiceRequestStatus {
                status: status.into(),
            },
        )
        .await?
        .data
        .expect("updated");
        assert_eq!(updated.status, status);
    }

    let mine = service_request_service::list_my_requests(&state, &client, StatusListQuery::default())
        .await?
        .data
        .expect("list");
    assert!(mine.items.iter().any(|r| r.id == request_id));

    // Another client cannot see it.
    let stranger = create_user(&state, Role::Client).await?;
    assert!(
        service_request_service::get_my_request(&state, &stranger, request_id)
            .await
            .is_err()
    );

    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out_and_cancel_is_owner_only() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let client = create_user(&state, Role::Client).await?;

    let request = CreateServiceRequest {
        catalog: CatalogKind::Data,
        full_name: "Jane Wanjiku".into(),
        email: "jane@example.com".into(),
        phone: "0712345678".into(),
        company_name: None,
        kra_pin: None,
        notes: None,
        priority: Priority::Standard,
    };
    let empty = service_request_service::create_request(&state, &client, request).await;
    assert!(empty.is_err());

    cart_service::add_item(
        &state,
        &client,
        CatalogKind::Business,
        AddCartItemRequest {
            service_id: "kra-pin-registration".into(),
            quantity: 2,
            custom_price: None,
        },
    )
    .await?;
    let created = service_request_service::create_request(
        &state,
        &client,
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
    assert_eq!(created.request.total_amount, 3_000);

    let stranger = create_user(&state, Role::Client).await?;
    assert!(
        service_request_service::cancel_request(&state, &stranger, created.request.id)
            .await
            .is_err()
    );

    let cancelled = service_request_service::cancel_request(&state, &client, created.request.id)
        .await?
        .data
        .expect("cancelled");
    assert_eq!(cancelled.status, "cancelled");

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run service request flow tests.");
            return Ok(None);
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, AppConfig::for_tests(database_url))))
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
