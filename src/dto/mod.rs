pub mod admin;
pub mod auth;
pub mod cart;
pub mod domain;
pub mod notifications;
pub mod payments;
pub mod service_requests;
pub mod users;
