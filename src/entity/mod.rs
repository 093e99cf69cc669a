pub mod cart_items;
pub mod notifications;
pub mod payments;
pub mod service_request_items;
pub mod service_requests;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use notifications::Entity as Notifications;
pub use payments::Entity as Payments;
pub use service_request_items::Entity as ServiceRequestItems;
pub use service_requests::Entity as ServiceRequests;
pub use users::Entity as Users;
