use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub service_type: String,
    pub payment_method: String,
    pub status: String,
    #[sea_orm(unique)]
    pub transaction_id: String,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub description: Option<String>,
    pub mpesa_number: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub card_last4: Option<String>,
    pub card_brand: Option<String>,
    pub bank_name: Option<String>,
    pub bank_reference: Option<String>,
    pub tax_amount: i64,
    pub tax_rate: i32,
    pub metadata: Json,
    pub confirm_after: Option<DateTimeWithTimeZone>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub failed_at: Option<DateTimeWithTimeZone>,
    pub refunded_at: Option<DateTimeWithTimeZone>,
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
