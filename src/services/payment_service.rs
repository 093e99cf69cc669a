use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::payments::{
        CreatePaymentRequest, PaymentEnvelope, PaymentList, PaymentStats,
        UpdatePaymentStatusRequest,
    },
    entity::payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Payment,
    response::{ApiResponse, Meta},
    routes::params::{SortOrder, StatusListQuery},
    services::notification_service::{Topic, notify},
    state::AppState,
    types::{PaymentMethod, PaymentStatus, ServiceType},
    validation::{card_brand, normalize_card_number, normalize_kenyan_phone},
};

pub const CURRENCY: &str = "KES";

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// `TXN-<yyyymmddHHMMSS>-<8 upper hex>`
pub fn transaction_id(now: DateTime<Utc>) -> String {
    format!("TXN-{}-{}", now.format("%Y%m%d%H%M%S"), short_hex())
}

/// `INV-<yyyymmdd>-<first 8 of the payment id>`
pub fn invoice_number(id: Uuid, now: DateTime<Utc>) -> String {
    let simple = id.simple().to_string();
    format!("INV-{}-{}", now.format("%Y%m%d"), simple[..8].to_uppercase())
}

/// Fields every payment carries, whatever the method.
#[derive(Debug, Clone)]
pub struct PaymentBase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Option<Uuid>,
    pub amount: i64,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl PaymentBase {
    pub fn new(user_id: Uuid, amount: i64, service_type: ServiceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            service_request_id: None,
            amount,
            service_type,
            description: None,
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    fn into_active(self, method: PaymentMethod, status: PaymentStatus) -> PaymentActive {
        let now = self.created_at;
        PaymentActive {
            id: Set(self.id),
            user_id: Set(self.user_id),
            service_request_id: Set(self.service_request_id),
            amount: Set(self.amount),
            currency: Set(CURRENCY.to_string()),
            service_type: Set(self.service_type.as_str().to_string()),
            payment_method: Set(method.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            transaction_id: Set(transaction_id(now)),
            invoice_number: Set(invoice_number(self.id, now)),
            description: Set(self.description),
            mpesa_number: Set(None),
            mpesa_receipt: Set(None),
            card_last4: Set(None),
            card_brand: Set(None),
            bank_name: Set(None),
            bank_reference: Set(None),
            tax_amount: Set(0),
            tax_rate: Set(0),
            metadata: Set(self.metadata),
            confirm_after: Set(None),
            paid_at: Set((status == PaymentStatus::Successful).then(|| now.into())),
            failed_at: Set(None),
            refunded_at: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}

/// A pending M-Pesa payment, confirmed by the background job once `confirm_after` passes.
pub fn mpesa_payment(base: PaymentBase, phone: String, confirm_after: DateTime<Utc>) -> PaymentActive {
    let mut active = base.into_active(PaymentMethod::Mpesa, PaymentStatus::Pending);
    active.mpesa_number = Set(Some(phone));
    active.confirm_after = Set(Some(confirm_after.into()));
    active
}

/// Card payment; only the last four digits and brand are kept.
pub fn card_payment(
    base: PaymentBase,
    card: Option<(String, String)>,
    status: PaymentStatus,
) -> PaymentActive {
    let mut active = base.into_active(PaymentMethod::Card, status);
    if let Some((last4, brand)) = card {
        active.card_last4 = Set(Some(last4));
        active.card_brand = Set(Some(brand));
    }
    active
}

pub fn bank_transfer_payment(
    base: PaymentBase,
    bank_name: Option<String>,
    bank_reference: Option<String>,
    status: PaymentStatus,
) -> PaymentActive {
    let mut active = base.into_active(PaymentMethod::BankTransfer, status);
    active.bank_name = Set(bank_name);
    active.bank_reference = Set(bank_reference);
    active
}

/// `(last4, brand)` of a 16-digit card number.
pub fn card_summary(raw: &str) -> AppResult<(String, String)> {
    let digits = normalize_card_number(raw)
        .ok_or_else(|| AppError::bad_request("Card number must be 16 digits"))?;
    Ok((digits[12..].to_string(), card_brand(&digits).to_string()))
}

pub fn mpesa_phone(raw: Option<&str>) -> AppResult<String> {
    raw.and_then(normalize_kenyan_phone).ok_or_else(|| {
        AppError::bad_request("A valid M-Pesa phone number is required (07XXXXXXXX or 01XXXXXXXX)")
    })
}

pub fn confirm_after(state: &AppState) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(state.config.mpesa_confirm_delay_secs)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentEnvelope>> {
    let service_type = ServiceType::normalize(&payload.service_type)?;
    let method = PaymentMethod::normalize(&payload.payment_method)?;
    if payload.amount <= 0 {
        return Err(AppError::bad_request("Amount must be greater than 0"));
    }

    let mut base = PaymentBase::new(user.user_id, payload.amount, service_type);
    base.description = trimmed(payload.description);
    if let Some(metadata) = payload.metadata.filter(Value::is_object) {
        base.metadata = metadata;
    }

    let active = match method {
        PaymentMethod::Mpesa => {
            let phone = mpesa_phone(payload.phone_number.as_deref())?;
            mpesa_payment(base, phone, confirm_after(state))
        }
        PaymentMethod::Card => {
            let card = trimmed(payload.card_number)
                .map(|raw| card_summary(&raw))
                .transpose()?;
            card_payment(base, card, PaymentStatus::Pending)
        }
        PaymentMethod::BankTransfer => bank_transfer_payment(
            base,
            trimmed(payload.bank_name),
            trimmed(payload.bank_reference),
            PaymentStatus::Pending,
        ),
    };

    let payment: Payment = active.insert(&state.orm).await?.into();

    tracing::info!(
        payment_id = %payment.id,
        user_id = %user.user_id,
        method = %method,
        amount = payment.amount,
        "payment created"
    );
    notify(
        &state.pool,
        user.user_id,
        Topic::Payment,
        "payment",
        "Payment initiated",
        &format!(
            "Your {} payment of {} {} ({}) has been initiated.",
            method, payment.currency, payment.amount, payment.reference
        ),
    )
    .await;
    audit::record(
        &state.pool,
        user.user_id,
        "payment_create",
        "payments",
        json!({ "payment_id": payment.id, "amount": payment.amount, "method": method }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment created",
        PaymentEnvelope { payment },
        Some(Meta::empty()),
    ))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: StatusListQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(PaymentCol::UserId.eq(user.user_id));
    if let Some(status) = query.status_filter() {
        let status: PaymentStatus = status.to_lowercase().parse()?;
        condition = condition.add(PaymentCol::Status.eq(status.as_str()));
    }

    let mut finder = Payments::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(PaymentCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(PaymentCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PaymentEnvelope>> {
    let payment = Payments::find_by_id(id)
        .filter(PaymentCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Payment",
        PaymentEnvelope {
            payment: payment.into(),
        },
        None,
    ))
}

pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<PaymentEnvelope>> {
    let next: PaymentStatus = payload.status.trim().to_lowercase().parse()?;

    let txn = state.orm.begin().await?;

    let existing = Payments::find_by_id(id)
        .filter(PaymentCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.service_request_id.is_some() {
        return Err(AppError::bad_request(
            "Payments for service requests are settled through the request",
        ));
    }
    let current: PaymentStatus = existing
        .status
        .parse()
        .map_err(|e| AppError::internal(format!("stored payment status: {e}")))?;
    let method: PaymentMethod = existing
        .payment_method
        .parse()
        .map_err(|e| AppError::internal(format!("stored payment method: {e}")))?;

    if !current.can_transition_to(next) {
        return Err(AppError::bad_request(format!(
            "Cannot change payment status from {current} to {next}"
        )));
    }

    let now = Utc::now();
    let mut metadata = existing.metadata.clone();
    let mut active: PaymentActive = existing.into();
    active.status = Set(next.as_str().to_string());
    active.confirm_after = Set(None);
    active.updated_at = Set(now.into());
    match next {
        PaymentStatus::Successful => active.paid_at = Set(Some(now.into())),
        PaymentStatus::Failed => active.failed_at = Set(Some(now.into())),
        PaymentStatus::Refunded => active.refunded_at = Set(Some(now.into())),
        _ => {}
    }

    if let Some(reference) = trimmed(payload.transaction_reference) {
        match method {
            PaymentMethod::Mpesa => active.mpesa_receipt = Set(Some(reference)),
            PaymentMethod::BankTransfer => active.bank_reference = Set(Some(reference)),
            PaymentMethod::Card => set_metadata(&mut metadata, "transaction_reference", reference),
        }
    }
    if let Some(reason) = trimmed(payload.failure_reason) {
        set_metadata(&mut metadata, "failure_reason", reason);
    }
    active.metadata = Set(metadata);

    let payment: Payment = active.update(&txn).await?.into();
    txn.commit().await?;

    tracing::info!(payment_id = %id, from = %current, to = %next, "payment status updated");
    notify(
        &state.pool,
        user.user_id,
        Topic::Payment,
        "payment",
        "Payment status updated",
        &format!("Payment {} is now {}.", payment.reference, next),
    )
    .await;
    audit::record(
        &state.pool,
        user.user_id,
        "payment_status_update",
        "payments",
        json!({ "payment_id": id, "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated",
        PaymentEnvelope { payment },
        Some(Meta::empty()),
    ))
}

fn set_metadata(metadata: &mut Value, key: &str, value: String) {
    if !metadata.is_object() {
        *metadata = json!({});
    }
    if let Some(map) = metadata.as_object_mut() {
        map.insert(key.to_string(), Value::String(value));
    }
}

pub async fn payment_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PaymentStats>> {
    let pool: &DbPool = &state.pool;
    let count_by_status = |status: PaymentStatus| {
        sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM payments WHERE user_id = $1 AND status = $2",
        )
        .bind(user.user_id)
        .bind(status.as_str())
        .fetch_one(pool)
    };

    let (total, paid, pending, failed) = tokio::try_join!(
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM payments WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_one(pool),
        sqlx::query_as::<_, (i64,)>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payments WHERE user_id = $1 AND status = 'successful'",
        )
        .bind(user.user_id)
        .fetch_one(pool),
        count_by_status(PaymentStatus::Pending),
        count_by_status(PaymentStatus::Failed),
    )?;

    Ok(ApiResponse::success(
        "Payment stats",
        PaymentStats {
            total_payments: total.0,
            total_paid: paid.0,
            pending_payments: pending.0,
            failed_payments: failed.0,
        },
        None,
    ))
}

/// Canned rows for demos. Refused in production.
pub async fn seed_sample(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PaymentList>> {
    if state.config.is_production() {
        return Err(AppError::Forbidden);
    }

    let mut mpesa = PaymentBase::new(user.user_id, 3_500, ServiceType::BusinessRegistration);
    mpesa.description = Some("Business name registration".to_string());
    let mut mpesa = mpesa_payment(mpesa, "0712345678".to_string(), Utc::now());
    mpesa.status = Set(PaymentStatus::Successful.as_str().to_string());
    mpesa.confirm_after = Set(None);
    mpesa.mpesa_receipt = Set(Some(format!("MP{}", short_hex())));
    mpesa.paid_at = Set(Some(Utc::now().into()));

    let mut card = PaymentBase::new(user.user_id, 3_000, ServiceType::KraServices);
    card.description = Some("Tax returns filing".to_string());
    let card = card_payment(
        card,
        Some(("1111".to_string(), "visa".to_string())),
        PaymentStatus::Successful,
    );

    let mut bank = PaymentBase::new(user.user_id, 15_000, ServiceType::DataServices);
    bank.description = Some("Data cleaning".to_string());
    let bank = bank_transfer_payment(
        bank,
        Some("KCB".to_string()),
        Some(format!("BT{}", short_hex())),
        PaymentStatus::Pending,
    );

    let mut items = Vec::with_capacity(3);
    for active in [mpesa, card, bank] {
        items.push(Payment::from(active.insert(&state.orm).await?));
    }

    tracing::info!(user_id = %user.user_id, count = items.len(), "sample payments seeded");
    Ok(ApiResponse::success(
        "Sample payments created",
        PaymentList { items },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn reference_formats() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 5, 7).single().expect("time");
        let txn = transaction_id(now);
        assert!(txn.starts_with("TXN-20261014090507-"), "{txn}");
        let suffix = &txn["TXN-20261014090507-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        let id = Uuid::parse_str("abcdef12-3456-4789-8abc-def012345678").expect("uuid");
        assert_eq!(invoice_number(id, now), "INV-20261014-ABCDEF12");
    }

    #[test]
    fn card_summary_keeps_last_four() {
        let (last4, brand) = card_summary("5500 0000 0000 0004").expect("card");
        assert_eq!(last4, "0004");
        assert_eq!(brand, "mastercard");
        assert!(card_summary("1234").is_err());
    }

    #[test]
    fn mpesa_phone_is_required_and_normalized() {
        assert_eq!(mpesa_phone(Some("+254712345678")).expect("phone"), "0712345678");
        assert!(mpesa_phone(None).is_err());
        assert!(mpesa_phone(Some("0812345678")).is_err());
    }

    fn value<T: Clone + Into<sea_orm::Value>>(v: &sea_orm::ActiveValue<T>) -> Option<T> {
        match v {
            sea_orm::ActiveValue::Set(x) | sea_orm::ActiveValue::Unchanged(x) => Some(x.clone()),
            sea_orm::ActiveValue::NotSet => None,
        }
    }

    #[test]
    fn constructors_fill_method_columns() {
        let base = PaymentBase::new(Uuid::new_v4(), 1_000, ServiceType::Bookkeeping);
        let due = Utc::now();
        let active = mpesa_payment(base.clone(), "0712345678".into(), due);
        assert_eq!(value(&active.payment_method).as_deref(), Some("mpesa"));
        assert_eq!(value(&active.status).as_deref(), Some("pending"));
        assert_eq!(value(&active.mpesa_number), Some(Some("0712345678".to_string())));
        assert_eq!(value(&active.paid_at), Some(None));
        assert!(value(&active.confirm_after).flatten().is_some());

        let card = card_payment(
            base.clone(),
            Some(("4242".into(), "visa".into())),
            PaymentStatus::Successful,
        );
        assert_eq!(value(&card.card_last4), Some(Some("4242".to_string())));
        assert!(value(&card.paid_at).flatten().is_some());
        assert_eq!(value(&card.mpesa_number), Some(None));

        let bank = bank_transfer_payment(base, Some("KCB".into()), None, PaymentStatus::Pending);
        assert_eq!(value(&bank.payment_method).as_deref(), Some("bank_transfer"));
        assert_eq!(value(&bank.tax_amount), Some(0));
        assert_eq!(value(&bank.currency).as_deref(), Some("KES"));
    }

    #[test]
    fn metadata_merge() {
        let mut metadata = Value::Null;
        set_metadata(&mut metadata, "failure_reason", "declined".into());
        assert_eq!(metadata["failure_reason"], "declined");
    }
}
