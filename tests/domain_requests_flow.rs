use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use biashara_hub::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        admin::RecentActivityQuery,
        domain::{DomainKind, DomainRequestBody, UpdateDomainStatusRequest},
    },
    middleware::auth::AuthUser,
    routes::params::{Pagination, StatusListQuery},
    services::{admin_service, domain_service, notification_service, settings_service},
    state::AppState,
    types::Role,
};

#[tokio::test]
async fn business_registration_is_tracked_and_admin_can_progress_it() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run domain request tests.");
            return Ok(());
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(pool, AppConfig::for_tests(database_url));

    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;

    // A partnership needs two directors.
    let short = domain_service::create_request(
        &state,
        &client,
        DomainKind::Business,
        DomainRequestBody {
            service_type: "partnership".into(),
            details: json!({
                "proposed_names": ["Wanjiku & Otieno"],
                "business_activity": "Consulting",
                "directors": [{ "full_name": "Jane Wanjiku", "id_number": "12345678" }]
            }),
        },
    )
    .await;
    assert!(short.is_err());

    let created = domain_service::create_request(
        &state,
        &client,
        DomainKind::Business,
        DomainRequestBody {
            service_type: "business_name".into(),
            details: json!({
                "proposed_names": ["Wanjiku Ventures", "Wanjiku Traders"],
                "business_activity": "General trade"
            }),
        },
    )
    .await?
    .data
    .expect("created");
    assert_eq!(created.status, "pending");
    assert_eq!(created.service_type, "business_name");
    assert!(created.tracking_number.as_deref().is_some_and(|t| t.starts_with("BR-")));

    let feed = admin_service::recent_activities(&state, RecentActivityQuery { limit: Some(50) })
        .await?
        .data
        .expect("activities");
    let entry = feed
        .iter()
        .find(|activity| activity.id == created.id)
        .expect("registration appears in the activity feed");
    assert_eq!(entry.kind, "business_registration");
    assert_eq!(entry.status.as_deref(), Some("pending"));

    // Unknown detail keys are rejected.
    let unknown_key = domain_service::create_request(
        &state,
        &client,
        DomainKind::Data,
        DomainRequestBody {
            service_type: "data_analysis".into(),
            details: json!({ "description": "Sales trends", "colour": "blue" }),
        },
    )
    .await;
    assert!(unknown_key.is_err());

    let mine = domain_service::list_my_requests(&state, &client, DomainKind::Business, Pagination::default())
        .await?
        .data
        .expect("mine");
    assert_eq!(mine.items.len(), 1);
    assert!(mine.items[0].tracking_number.is_some());

    let updated = domain_service::update_request_status(
        &state,
        &admin,
        DomainKind::Business,
        created.id,
        UpdateDomainStatusRequest {
            status: "In_Progress".into(),
        },
    )
    .await?
    .data
    .expect("updated");
    assert_eq!(updated.status, "in_progress");

    let bogus = domain_service::update_request_status(
        &state,
        &admin,
        DomainKind::Business,
        created.id,
        UpdateDomainStatusRequest {
            status: "shipped".into(),
        },
    )
    .await;
    assert!(bogus.is_err());

    // No going back to pending once work has started.
    let backwards = domain_service::update_request_status(
        &state,
        &admin,
        DomainKind::Business,
        created.id,
        UpdateDomainStatusRequest {
            status: "pending".into(),
        },
    )
    .await;
    assert!(backwards.is_err());

    let all = domain_service::list_all_requests(
        &state,
        DomainKind::Business,
        StatusListQuery {
            status: Some("in_progress".into()),
            ..StatusListQuery::default()
        },
    )
    .await?
    .data
    .expect("all");
    let row = all
        .items
        .iter()
        .find(|row| row.request.id == created.id)
        .expect("admin sees the request");
    assert_eq!(row.user_first_name, "Test");

    let completed = domain_service::update_request_status(
        &state,
        &admin,
        DomainKind::Business,
        created.id,
        UpdateDomainStatusRequest {
            status: "completed".into(),
        },
    )
    .await?
    .data
    .expect("completed");
    assert_eq!(completed.status, "completed");

    let reopened = domain_service::update_request_status(
        &state,
        &admin,
        DomainKind::Business,
        created.id,
        UpdateDomainStatusRequest {
            status: "in_progress".into(),
        },
    )
    .await;
    assert!(reopened.is_err());

    Ok(())
}

#[tokio::test]
async fn admin_fan_out_respects_each_admins_service_updates() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run domain request tests.");
            return Ok(());
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(pool, AppConfig::for_tests(database_url));

    let subscribed = create_user(&state, Role::Admin).await?;
    let muted = create_user(&state, Role::Admin).await?;
    sqlx::query("INSERT INTO user_notification_settings (user_id, service_updates) VALUES ($1, false)")
        .bind(muted.user_id)
        .execute(&state.pool)
        .await?;

    let title = format!("New request {}", Uuid::new_v4());
    notification_service::notify_admins(&state.pool, "service_request", &title, "A request arrived.").await;

    let count = |user_id: Uuid| {
        let pool = state.pool.clone();
        let title = title.clone();
        async move {
            sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND title = $2",
            )
            .bind(user_id)
            .bind(title)
            .fetch_one(&pool)
            .await
            .map(|(n,)| n)
        }
    };

    let enabled = settings_service::load_system_settings(&state.pool)
        .await?
        .notify_admin_on_new_request;
    assert_eq!(count(subscribed.user_id).await?, i64::from(enabled));
    assert_eq!(count(muted.user_id).await?, 0);

    Ok(())
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
