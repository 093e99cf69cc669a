use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    models::Notification,
    routes::params::{Pagination, de_opt_bool},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotificationListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct NotificationList {
    #[schema(value_type = Vec<Notification>)]
    pub items: Vec<Notification>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatedCount {
    pub updated: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub payment_updates: bool,
    pub service_updates: bool,
    pub marketing: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            sms_notifications: false,
            payment_updates: true,
            service_updates: true,
            marketing: false,
        }
    }
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateNotificationSettings {
    pub email_notifications: Option<bool>,
    pub sms_notifications: Option<bool>,
    pub payment_updates: Option<bool>,
    pub service_updates: Option<bool>,
    pub marketing: Option<bool>,
}

impl NotificationSettings {
    pub fn apply(mut self, patch: UpdateNotificationSettings) -> Self {
        if let Some(v) = patch.email_notifications {
            self.email_notifications = v;
        }
        if let Some(v) = patch.sms_notifications {
            self.sms_notifications = v;
        }
        if let Some(v) = patch.payment_updates {
            self.payment_updates = v;
        }
        if let Some(v) = patch.service_updates {
            self.service_updates = v;
        }
        if let Some(v) = patch.marketing {
            self.marketing = v;
        }
        self
    }
}
