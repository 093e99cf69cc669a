use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    cart::{Cart, CartError},
    dto::service_requests::{
        CreateServiceRequest, PayServiceRequestResponse, PaymentDetails, ServiceRequestList,
        ServiceRequestWithItems, UpdateServiceRequestStatus,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        payments::{Column as PaymentCol, Entity as Payments},
        service_request_items::{
            ActiveModel as ItemActive, Column as ItemCol, Entity as ServiceRequestItems,
        },
        service_requests::{
            ActiveModel as RequestActive, Column as RequestCol, Entity as ServiceRequests,
            Model as RequestModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Payment, ServiceRequest, ServiceRequestItem},
    response::{ApiResponse, Meta},
    routes::params::{SortOrder, StatusListQuery},
    services::{
        auth_service::{optional_field, optional_kra_pin},
        notification_service::{Topic, notify, notify_admins},
        payment_service::{
            PaymentBase, bank_transfer_payment, card_payment, card_summary, confirm_after,
            mpesa_payment, mpesa_phone,
        },
    },
    state::AppState,
    types::{CatalogKind, PaymentStatus, RequestStatus},
    validation::{is_unexpired_card, is_valid_cvv, is_valid_email, normalize_kenyan_phone, require_non_empty},
};

/// `SR-<yyyymmdd>-<8 upper hex>`
pub fn request_number(now: DateTime<Utc>) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("SR-{}-{}", now.format("%Y%m%d"), simple[..8].to_uppercase())
}

fn stored_status(model: &RequestModel) -> AppResult<RequestStatus> {
    model
        .status
        .parse()
        .map_err(|e| AppError::internal(format!("stored request status: {e}")))
}

/// Locks the request's pending and processing payments.
///
/// The confirmation job locks a payment before its request, so every path that
/// cancels a request takes the payment locks first and then the request lock.
async fn lock_open_payments<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<usize> {
    let mut query = Payments::find()
        .filter(PaymentCol::ServiceRequestId.eq(request_id))
        .filter(PaymentCol::Status.is_in([
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Processing.as_str(),
        ]));
    if let Some(owner) = owner {
        query = query.filter(PaymentCol::UserId.eq(owner));
    }
    Ok(query.lock(LockType::Update).all(conn).await?.len())
}

async fn cancel_open_payments<C: ConnectionTrait>(conn: &C, request_id: Uuid) -> AppResult<u64> {
    let result = Payments::update_many()
        .col_expr(PaymentCol::Status, Expr::value(PaymentStatus::Cancelled.as_str()))
        .col_expr(PaymentCol::ConfirmAfter, Expr::cust("NULL"))
        .col_expr(PaymentCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(PaymentCol::ServiceRequestId.eq(request_id))
        .filter(PaymentCol::Status.is_in([
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Processing.as_str(),
        ]))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn load_items<C: ConnectionTrait>(conn: &C, request_id: Uuid) -> AppResult<Vec<ServiceRequestItem>> {
    Ok(ServiceRequestItems::find()
        .filter(ItemCol::ServiceRequestId.eq(request_id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(ServiceRequestItem::from)
        .collect())
}

pub async fn create_request(
    state: &AppState,
    user: &AuthUser,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<ServiceRequestWithItems>> {
    require_non_empty(&payload.full_name, "Full name")?;
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("A valid email is required"));
    }
    let phone = normalize_kenyan_phone(&payload.phone)
        .ok_or_else(|| AppError::bad_request("Invalid phone number format"))?;
    let kra_pin = optional_kra_pin(payload.kra_pin)?;
    let kind = payload.catalog;

    let txn = state.orm.begin().await?;

    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::Catalog.eq(kind.as_str()))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let cart = Cart::from_rows(
        kind,
        rows.into_iter()
            .map(|row| (row.service_id, row.quantity, row.custom_price)),
    );
    if cart.is_empty() {
        return Err(AppError::bad_request("Cart is empty"));
    }

    let subtotal = cart.total()?;
    let priority_fee = payload
        .priority
        .fee_for(subtotal)
        .ok_or(CartError::AmountOverflow)?;
    let total_amount = subtotal
        .checked_add(priority_fee)
        .ok_or(CartError::AmountOverflow)?;
    let request = RequestActive {
        id: Set(Uuid::new_v4()),
        request_number: Set(request_number(Utc::now())),
        user_id: Set(user.user_id),
        catalog: Set(kind.as_str().to_string()),
        full_name: Set(payload.full_name.trim().to_string()),
        email: Set(email),
        phone: Set(phone),
        company_name: Set(optional_field(payload.company_name)),
        kra_pin: Set(kra_pin),
        notes: Set(optional_field(payload.notes)),
        priority: Set(payload.priority.as_str().to_string()),
        subtotal: Set(subtotal),
        priority_fee: Set(priority_fee),
        total_amount: Set(total_amount),
        status: Set(RequestStatus::PendingPayment.as_str().to_string()),
        payment_method: Set(None),
        payment_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(cart.lines().len());
    for line in cart.lines() {
        let item = ItemActive {
            id: Set(Uuid::new_v4()),
            service_request_id: Set(request.id),
            service_id: Set(line.service_id.clone()),
            name: Set(line.name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price()),
            total: Set(line.total()?),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(ServiceRequestItem::from(item));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::Catalog.eq(kind.as_str()))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let request = ServiceRequest::from(request);
    tracing::info!(
        request_id = %request.id,
        user_id = %user.user_id,
        catalog = %kind,
        total = request.total_amount,
        "service request created from cart"
    );
    notify(
        &state.pool,
        user.user_id,
        Topic::Service,
        "service_request",
        "Service request created",
        &format!(
            "Request {} was created. Amount due: KES {}.",
            request.request_number, request.total_amount
        ),
    )
    .await;
    notify_admins(
        &state.pool,
        "new_service_request",
        "New service request",
        &format!("{} submitted request {}.", request.full_name, request.request_number),
    )
    .await;
    audit::record(
        &state.pool,
        user.user_id,
        "service_request_create",
        "service_requests",
        json!({ "id": request.id, "catalog": kind, "total_amount": request.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Service request created",
        ServiceRequestWithItems { request, items },
        Some(Meta::empty()),
    ))
}

async fn list_requests(
    state: &AppState,
    owner: Option<Uuid>,
    query: StatusListQuery,
) -> AppResult<ApiResponse<ServiceRequestList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = owner {
        condition = condition.add(RequestCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status_filter() {
        let status: RequestStatus = status.parse()?;
        condition = condition.add(RequestCol::Status.eq(status.as_str()));
    }

    let finder = ServiceRequests::find().filter(condition);
    let finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(RequestCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(RequestCol::CreatedAt),
    };
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ServiceRequest::from)
        .collect();

    Ok(ApiResponse::success(
        "Service requests",
        ServiceRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_my_requests(
    state: &AppState,
    user: &AuthUser,
    query: StatusListQuery,
) -> AppResult<ApiResponse<ServiceRequestList>> {
    list_requests(state, Some(user.user_id), query).await
}

pub async fn get_my_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ServiceRequestWithItems>> {
    let request = ServiceRequests::find_by_id(id)
        .filter(RequestCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = load_items(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Service request",
        ServiceRequestWithItems {
            request: request.into(),
            items,
        },
        None,
    ))
}

/// Payment details after validation, ready to become a payment row.
enum Tender {
    Mpesa { phone: String },
    Card { last4: String, brand: String },
    Bank { bank_name: String, account_name: String, reference: String },
}

fn required(value: &str, field: &str) -> AppResult<String> {
    require_non_empty(value, field)?;
    Ok(value.trim().to_string())
}

fn validate_tender(details: PaymentDetails, today: chrono::NaiveDate) -> AppResult<Tender> {
    match details {
        PaymentDetails::Mpesa { phone_number } => Ok(Tender::Mpesa {
            phone: mpesa_phone(Some(phone_number.as_str()))?,
        }),
        PaymentDetails::Card {
            card_number,
            card_holder,
            expiry,
            cvv,
        } => {
            let (last4, brand) = card_summary(&card_number)?;
            require_non_empty(&card_holder, "Card holder")?;
            if !is_unexpired_card(&expiry, today) {
                return Err(AppError::bad_request("Card expiry must be a future MM/YY date"));
            }
            if !is_valid_cvv(&cvv) {
                return Err(AppError::bad_request("CVV must be 3 or 4 digits"));
            }
            Ok(Tender::Card { last4, brand })
        }
        PaymentDetails::BankTransfer {
            bank_name,
            account_name,
            reference,
        } => Ok(Tender::Bank {
            bank_name: required(&bank_name, "Bank name")?,
            account_name: required(&account_name, "Account name")?,
            reference: required(&reference, "Reference")?,
        }),
    }
}

pub async fn pay_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    details: PaymentDetails,
) -> AppResult<ApiResponse<PayServiceRequestResponse>> {
    let method = details.method();
    let tender = validate_tender(details, Utc::now().date_naive())?;

    let txn = state.orm.begin().await?;

    let request = ServiceRequests::find_by_id(id)
        .filter(RequestCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if stored_status(&request)? != RequestStatus::PendingPayment {
        return Err(AppError::bad_request("This request is not awaiting payment"));
    }

    let already_paid = Payments::find()
        .filter(PaymentCol::ServiceRequestId.eq(id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Successful.as_str()))
        .count(&txn)
        .await?;
    if already_paid > 0 {
        return Err(AppError::bad_request("This request has already been paid"));
    }

    let in_flight = Payments::find()
        .filter(PaymentCol::ServiceRequestId.eq(id))
        .filter(PaymentCol::Status.is_in([
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Processing.as_str(),
        ]))
        .count(&txn)
        .await?;
    if in_flight > 0 {
        return Err(AppError::bad_request("A payment for this request is already in progress"));
    }

    let kind: CatalogKind = request
        .catalog
        .parse()
        .map_err(|e| AppError::internal(format!("stored request catalog: {e}")))?;
    let mut base = PaymentBase::new(user.user_id, request.total_amount, kind.service_type());
    base.service_request_id = Some(id);
    base.description = Some(format!("Payment for {}", request.request_number));

    let (active, paid) = match tender {
        Tender::Mpesa { phone } => (mpesa_payment(base, phone, confirm_after(state)), false),
        Tender::Card { last4, brand } => (
            card_payment(base, Some((last4, brand)), PaymentStatus::Successful),
            true,
        ),
        Tender::Bank {
            bank_name,
            account_name,
            reference,
        } => {
            base.metadata = json!({ "account_name": account_name });
            (
                bank_transfer_payment(base, Some(bank_name), Some(reference), PaymentStatus::Successful),
                true,
            )
        }
    };
    let payment = active.insert(&txn).await?;

    let mut update: RequestActive = request.into();
    update.payment_method = Set(Some(method.as_str().to_string()));
    update.payment_id = Set(Some(payment.id));
    if paid {
        update.status = Set(RequestStatus::PaidPendingProcessing.as_str().to_string());
    }
    update.updated_at = Set(Utc::now().into());
    let request = update.update(&txn).await?;

    txn.commit().await?;

    let request = ServiceRequest::from(request);
    let payment = Payment::from(payment);
    tracing::info!(
        request_id = %id,
        payment_id = %payment.id,
        method = %method,
        status = %payment.status,
        "service request payment recorded"
    );
    let message = if paid {
        format!(
            "Payment {} of KES {} for request {} was successful.",
            payment.reference, payment.amount, request.request_number
        )
    } else {
        format!(
            "Confirm the M-Pesa prompt to pay KES {} for request {}.",
            payment.amount, request.request_number
        )
    };
    notify(&state.pool, user.user_id, Topic::Payment, "payment", "Payment update", &message).await;
    audit::record(
        &state.pool,
        user.user_id,
        "service_request_pay",
        "service_requests",
        json!({ "id": id, "payment_id": payment.id, "method": method }),
    )
    .await;

    Ok(ApiResponse::success(
        if paid { "Payment successful" } else { "Payment initiated" },
        PayServiceRequestResponse { request, payment },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ServiceRequest>> {
    let txn = state.orm.begin().await?;

    lock_open_payments(&txn, id, Some(user.user_id)).await?;
    let request = ServiceRequests::find_by_id(id)
        .filter(RequestCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if stored_status(&request)? != RequestStatus::PendingPayment {
        return Err(AppError::bad_request("Only requests awaiting payment can be cancelled"));
    }

    let cancelled_payments = cancel_open_payments(&txn, id).await?;
    let mut update: RequestActive = request.into();
    update.status = Set(RequestStatus::Cancelled.as_str().to_string());
    update.updated_at = Set(Utc::now().into());
    let request = update.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(request_id = %id, cancelled_payments, "service request cancelled by owner");
    audit::record(
        &state.pool,
        user.user_id,
        "service_request_cancel",
        "service_requests",
        json!({ "id": id }),
    )
    .await;

    Ok(ApiResponse::success("Service request cancelled", request.into(), None))
}

pub async fn list_all_requests(
    state: &AppState,
    query: StatusListQuery,
) -> AppResult<ApiResponse<ServiceRequestList>> {
    list_requests(state, None, query).await
}

pub async fn update_request_status(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateServiceRequestStatus,
) -> AppResult<ApiResponse<ServiceRequest>> {
    let next: RequestStatus = payload.status.trim().to_lowercase().parse()?;

    let txn = state.orm.begin().await?;

    if next == RequestStatus::Cancelled {
        lock_open_payments(&txn, id, None).await?;
    }
    let request = ServiceRequests::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = stored_status(&request)?;
    if !current.can_transition_to(next) {
        return Err(AppError::bad_request(format!(
            "Cannot change request status from {current} to {next}"
        )));
    }

    if next == RequestStatus::Cancelled {
        cancel_open_payments(&txn, id).await?;
    }
    let mut update: RequestActive = request.into();
    update.status = Set(next.as_str().to_string());
    update.updated_at = Set(Utc::now().into());
    let request = ServiceRequest::from(update.update(&txn).await?);

    txn.commit().await?;

    tracing::info!(request_id = %id, from = %current, to = %next, "service request status updated");
    notify(
        &state.pool,
        request.user_id,
        Topic::Service,
        "service_status",
        "Service request updated",
        &format!(
            "Request {} is now {}.",
            request.request_number,
            next.as_str().replace('_', " ")
        ),
    )
    .await;
    audit::record(
        &state.pool,
        admin.user_id,
        "service_request_status_update",
        "service_requests",
        json!({ "id": id, "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::success("Service request status updated", request, None))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).expect("date")
    }

    #[test]
    fn request_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).single().expect("time");
        let number = request_number(now);
        assert!(number.starts_with("SR-20261014-"));
        let suffix = &number["SR-20261014-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn card_tender_keeps_only_summary() {
        let tender = validate_tender(
            PaymentDetails::Card {
                card_number: "4111-1111-1111-1234".into(),
                card_holder: "Jane Wanjiku".into(),
                expiry: "12/30".into(),
                cvv: "123".into(),
            },
            today(),
        )
        .expect("valid card");
        match tender {
            Tender::Card { last4, brand } => {
                assert_eq!(last4, "1234");
                assert_eq!(brand, "visa");
            }
            _ => panic!("expected card tender"),
        }
    }

    #[test]
    fn card_tender_rejects_bad_fields() {
        let card = |number: &str, holder: &str, expiry: &str, cvv: &str| PaymentDetails::Card {
            card_number: number.into(),
            card_holder: holder.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
        };
        assert!(validate_tender(card("4111 1111 1111", "Jane", "12/30", "123"), today()).is_err());
        assert!(validate_tender(card("4111111111111111", " ", "12/30", "123"), today()).is_err());
        assert!(validate_tender(card("4111111111111111", "Jane", "09/26", "123"), today()).is_err());
        assert!(validate_tender(card("4111111111111111", "Jane", "12/30", "12"), today()).is_err());
        assert!(validate_tender(card("4111111111111111", "Jane", "10/26", "1234"), today()).is_ok());
    }

    #[test]
    fn bank_and_mpesa_tenders() {
        let bank = PaymentDetails::BankTransfer {
            bank_name: " KCB ".into(),
            account_name: "Acme Ltd".into(),
            reference: "".into(),
        };
        assert!(validate_tender(bank, today()).is_err());

        let mpesa = PaymentDetails::Mpesa {
            phone_number: "+254712345678".into(),
        };
        match validate_tender(mpesa, today()).ok() {
            Some(Tender::Mpesa { phone }) => assert_eq!(phone, "0712345678"),
            _ => panic!("expected mpesa tender"),
        }
    }
}
