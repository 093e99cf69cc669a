use chrono::Utc;
use uuid::Uuid;

use biashara_hub::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    middleware::auth::AuthUser,
    services::{auth_service::hash_password, payment_service::seed_sample},
    state::AppState,
    types::Role,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    if config.is_production() {
        anyhow::bail!("refusing to seed a production database");
    }

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", ("Admin", "User"), "admin").await?;
    let client_id =
        ensure_user(&pool, "client@example.com", "client123", ("Jane", "Wanjiku"), "client").await?;

    let state = AppState::new(pool, config);
    let client = AuthUser {
        user_id: client_id,
        role: Role::Client,
        issued_at: Utc::now(),
    };
    let seeded = seed_sample(&state, &client).await?;
    let count = seeded.data.map(|list| list.items.len()).unwrap_or(0);

    println!("Seed completed. Admin ID: {admin_id}, Client ID: {client_id}, payments: {count}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    (first_name, last_name): (&str, &str),
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}
