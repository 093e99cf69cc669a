pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod domain_service;
pub mod notification_service;
pub mod payment_service;
pub mod service_request_service;
pub mod settings_service;
pub mod user_service;
