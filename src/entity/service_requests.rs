use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "service_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub request_number: String,
    pub user_id: Uuid,
    pub catalog: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
    pub kra_pin: Option<String>,
    pub notes: Option<String>,
    pub priority: String,
    pub subtotal: i64,
    pub priority_fee: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: Option<String>,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::service_request_items::Entity")]
    ServiceRequestItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::service_request_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceRequestItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
