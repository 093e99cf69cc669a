use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    cart::CartLine,
    catalog::{Catalog, CatalogCategory, CatalogService},
    dto::{
        admin::{
            Activity, AdminPayment, AdminPaymentList, DashboardStats, Invoice, InvoiceList,
            MonthlyRevenue, RevenueReport, ServiceTypeRevenue, SystemSettings,
            UpdateSystemSettings,
        },
        auth::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, ForgotPasswordResponse,
            LoginRequest, RegisterRequest, ResetPasswordRequest, SuccessResponse,
            ValidateResetTokenRequest, ValidateResetTokenResponse, VerifyTokenRequest,
            VerifyTokenResponse,
        },
        cart::{AddCartItemRequest, CartView, ToggleCartItemRequest, ToggleResult, UpdateCartItemRequest},
        domain::{
            AdminDomainRequestList, BookkeepingDetails, BusinessDetails, DataDetails, Director,
            DomainRequestBody, DomainRequestList, DomainRequestWithUser, KraDetails,
            UpdateDomainStatusRequest,
        },
        notifications::{
            NotificationList, NotificationSettings, UnreadCount, UpdateNotificationSettings,
            UpdatedCount,
        },
        payments::{
            CreatePaymentRequest, PaymentEnvelope, PaymentList, PaymentStats,
            UpdatePaymentStatusRequest,
        },
        service_requests::{
            CreateServiceRequest, PayServiceRequestResponse, PaymentDetails, ServiceRequestList,
            ServiceRequestWithItems, UpdateServiceRequestStatus,
        },
        users::{UpdateProfileRequest, UpdateRoleRequest, UserList},
    },
    models::{DomainRequest, Notification, Payment, ServiceRequest, ServiceRequestItem, UserProfile},
    response::Meta,
    routes::{
        admin, auth, bookkeeping, business, cart, catalog, data_services, health, kra,
        notifications, payments, service_requests, users,
    },
    types::{CatalogKind, PaymentMethod, PaymentStatus, Priority, RequestStatus, Role, ServiceType},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::forgot_password,
        auth::validate_reset_token,
        auth::reset_password,
        auth::change_password,
        auth::verify_token,
        auth::me,
        users::get_profile,
        users::update_profile,
        data_services::create_request,
        data_services::my_requests,
        data_services::admin_requests,
        data_services::update_status,
        business::create_request,
        business::my_requests,
        business::admin_requests,
        business::update_status,
        kra::create_request,
        kra::my_requests,
        kra::admin_requests,
        kra::update_status,
        bookkeeping::create_request,
        bookkeeping::my_requests,
        bookkeeping::admin_requests,
        bookkeeping::update_status,
        payments::list_payments,
        payments::create_payment,
        payments::payment_stats,
        payments::seed_sample,
        payments::get_payment,
        payments::update_payment_status,
        catalog::list_catalogs,
        catalog::get_catalog,
        catalog::get_service,
        cart::get_cart,
        cart::add_item,
        cart::toggle_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        service_requests::create_request,
        service_requests::list_requests,
        service_requests::get_request,
        service_requests::pay_request,
        service_requests::cancel_request,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        notifications::get_settings,
        notifications::update_settings,
        admin::dashboard_stats,
        admin::recent_activities,
        admin::list_payments,
        admin::invoices,
        admin::revenue_report,
        admin::get_settings,
        admin::update_settings,
        admin::list_users,
        admin::update_user_role,
        admin::list_service_requests,
        admin::update_service_request_status
    ),
    components(
        schemas(
            Meta,
            Role,
            ServiceType,
            PaymentMethod,
            PaymentStatus,
            CatalogKind,
            Priority,
            RequestStatus,
            UserProfile,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            ForgotPasswordRequest,
            ForgotPasswordResponse,
            ValidateResetTokenRequest,
            ValidateResetTokenResponse,
            ResetPasswordRequest,
            ChangePasswordRequest,
            VerifyTokenRequest,
            VerifyTokenResponse,
            SuccessResponse,
            UpdateProfileRequest,
            UpdateRoleRequest,
            UserList,
            DomainRequest,
            DomainRequestBody,
            DataDetails,
            BusinessDetails,
            Director,
            KraDetails,
            BookkeepingDetails,
            DomainRequestList,
            DomainRequestWithUser,
            AdminDomainRequestList,
            UpdateDomainStatusRequest,
            Payment,
            CreatePaymentRequest,
            UpdatePaymentStatusRequest,
            PaymentEnvelope,
            PaymentList,
            PaymentStats,
            Catalog,
            CatalogCategory,
            CatalogService,
            CartLine,
            CartView,
            AddCartItemRequest,
            ToggleCartItemRequest,
            UpdateCartItemRequest,
            ToggleResult,
            ServiceRequest,
            ServiceRequestItem,
            CreateServiceRequest,
            PaymentDetails,
            ServiceRequestWithItems,
            PayServiceRequestResponse,
            ServiceRequestList,
            UpdateServiceRequestStatus,
            Notification,
            NotificationList,
            NotificationSettings,
            UpdateNotificationSettings,
            UnreadCount,
            UpdatedCount,
            DashboardStats,
            Activity,
            AdminPayment,
            AdminPaymentList,
            Invoice,
            InvoiceList,
            MonthlyRevenue,
            ServiceTypeRevenue,
            RevenueReport,
            SystemSettings,
            UpdateSystemSettings
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password recovery"),
        (name = "Users", description = "Profile endpoints"),
        (name = "Data Services", description = "Data analysis and visualization requests"),
        (name = "Business Registration", description = "Business registration requests"),
        (name = "KRA", description = "KRA tax service requests"),
        (name = "Bookkeeping", description = "Bookkeeping requests"),
        (name = "Payments", description = "Payment endpoints"),
        (name = "Catalog", description = "Service catalogs"),
        (name = "Cart", description = "Per-catalog service selection"),
        (name = "Service Requests", description = "Requests created from a cart"),
        (name = "Notifications", description = "Notification endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
