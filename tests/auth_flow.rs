use biashara_hub::{
    config::{AppConfig, Environment},
    db::{create_pool, run_migrations},
    dto::auth::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResetPasswordRequest, ValidateResetTokenRequest,
    },
    middleware::auth::AuthUser,
    services::auth_service,
    state::AppState,
    tokens::decode_token,
    types::Role,
};
use chrono::Utc;
use uuid::Uuid;

// Register -> login -> forgot/reset password -> change password.
#[tokio::test]
async fn register_login_and_password_recovery_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run auth flow tests.");
            return Ok(());
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    // Development mode returns the reset link in the response.
    let mut config = AppConfig::for_tests(database_url);
    config.environment = Environment::Development;
    let state = AppState::new(pool, config);

    let email = format!("Jane.{}@Example.com", Uuid::new_v4().simple());
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "secret123".into(),
            first_name: " Jane ".into(),
            last_name: "Wanjiku".into(),
            phone: Some("+254712345678".into()),
            company_name: None,
            kra_pin: Some("a123456789z".into()),
        },
    )
    .await?
    .data
    .expect("registered");
    assert_eq!(registered.user.email, email.to_lowercase());
    assert_eq!(registered.user.first_name, "Jane");
    assert_eq!(registered.user.role, "client");
    assert_eq!(registered.user.phone.as_deref(), Some("0712345678"));
    assert_eq!(registered.user.kra_pin.as_deref(), Some("A123456789Z"));
    let claims = decode_token(&state.config.jwt_secret, &registered.token).expect("valid token");
    assert_eq!(claims.user_id, registered.user.id);

    // Same email in another case is still a duplicate.
    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: "secret123".into(),
            first_name: "Jane".into(),
            last_name: "Wanjiku".into(),
            phone: None,
            company_name: None,
            kra_pin: None,
        },
    )
    .await;
    assert!(duplicate.is_err());

    let login = |password: &str| LoginRequest {
        email: email.clone(),
        password: password.to_string(),
    };
    assert!(auth_service::login_user(&state, login("wrong-password")).await.is_err());
    let logged_in = auth_service::login_user(&state, login("secret123"))
        .await?
        .data
        .expect("login");
    assert_eq!(logged_in.user.id, registered.user.id);

    let forgot = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: email.clone(),
        },
    )
    .await?
    .data
    .expect("forgot");
    let link = forgot.reset_link.expect("reset link in development");
    let token = link.split("token=").nth(1).expect("token").to_string();

    // Unknown emails get the same answer and no link.
    let unknown = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "nobody@example.com".into(),
        },
    )
    .await?
    .data
    .expect("forgot");
    assert_eq!(unknown.message, forgot.message);
    assert!(unknown.reset_link.is_none());

    let valid = auth_service::validate_reset_token(
        &state,
        ValidateResetTokenRequest {
            token: token.clone(),
        },
    )
    .await?
    .data
    .expect("valid");
    assert!(valid.valid);
    assert_eq!(valid.email, email.to_lowercase());

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: token.clone(),
            new_password: "newsecret1".into(),
        },
    )
    .await?;

    // The token is single use.
    assert!(
        auth_service::reset_password(
            &state,
            ResetPasswordRequest {
                token,
                new_password: "another1".into(),
            },
        )
        .await
        .is_err()
    );
    auth_service::login_user(&state, login("newsecret1")).await?;

    let auth = AuthUser {
        user_id: registered.user.id,
        role: Role::Client,
        issued_at: Utc::now(),
    };
    assert!(
        auth_service::change_password(
            &state,
            &auth,
            ChangePasswordRequest {
                current_password: "secret123".into(),
                new_password: "changed99".into(),
            },
        )
        .await
        .is_err()
    );
    auth_service::change_password(
        &state,
        &auth,
        ChangePasswordRequest {
            current_password: "newsecret1".into(),
            new_password: "changed99".into(),
        },
    )
    .await?;
    auth_service::login_user(&state, login("changed99")).await?;

    let verified = auth_service::verify_token(&state, Some(logged_in.token))
        .await?
        .data
        .expect("verified");
    assert!(verified.valid);

    Ok(())
}
