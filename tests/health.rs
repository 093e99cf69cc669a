use axum::extract::State;
use biashara_hub::{config::AppConfig, db::create_lazy_pool, routes::health::health_check, state::AppState};

#[tokio::test]
async fn health_check_returns_ok() {
    let config = AppConfig::for_tests("postgres://localhost/unused");
    let pool = create_lazy_pool(&config.database_url).expect("lazy pool");
    let state = AppState::new(pool, config);

    let response = health_check(State(state)).await;
    assert_eq!(response.0.message, "Health check");
    assert!(response.0.data.is_some());
}
