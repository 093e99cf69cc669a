use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    db::DbPool,
    dto::{
        admin::{
            Activity, AdminPayment, AdminPaymentList, AdminPaymentQuery, DashboardStats, Invoice,
            InvoiceList, MonthlyRevenue, RecentActivityQuery, RevenueReport, ServiceTypeRevenue,
        },
        domain::DomainKind,
    },
    entity::{
        payments::{Column as PaymentCol, Entity as Payments},
        users::Entity as Users,
    },
    error::AppResult,
    models::Payment,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
    types::{PaymentMethod, PaymentStatus},
};

/// Every table holding a client request, for the dashboard counters.
const REQUEST_TABLES: [&str; 5] = [
    "data_services",
    "business_registrations",
    "kra_services",
    "bookkeeping_services",
    "service_requests",
];

fn summed_count(filter: &str) -> String {
    let parts: Vec<String> = REQUEST_TABLES
        .iter()
        .map(|table| format!("(SELECT COUNT(*) FROM {table} {filter})"))
        .collect();
    format!("SELECT ({})::BIGINT", parts.join(" + "))
}

async fn scalar(pool: &DbPool, sql: &str) -> Result<i64, sqlx::Error> {
    let (value,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(value)
}

pub async fn dashboard_stats(state: &AppState) -> AppResult<ApiResponse<DashboardStats>> {
    let pool = &state.pool;
    let active_sql = summed_count("WHERE status NOT IN ('completed', 'cancelled', 'rejected')");
    let total_sql = summed_count("");

    let (total_users, active_services, pending_payments, total_revenue, new_users, total_services) = tokio::try_join!(
        scalar(pool, "SELECT COUNT(*) FROM users"),
        scalar(pool, &active_sql),
        scalar(pool, "SELECT COUNT(*) FROM payments WHERE status = 'pending'"),
        scalar(
            pool,
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payments WHERE status = 'successful'",
        ),
        scalar(
            pool,
            "SELECT COUNT(*) FROM users WHERE created_at >= now() - interval '30 days'",
        ),
        scalar(pool, &total_sql),
    )?;

    Ok(ApiResponse::success(
        "Dashboard stats",
        DashboardStats {
            total_users,
            active_services,
            pending_payments,
            total_revenue,
            new_users,
            total_services,
        },
        None,
    ))
}

/// The activity feed: service requests, payments, registrations and one
/// branch per category table, newest first, limited by `$1`.
fn recent_activity_sql() -> String {
    let mut branches = vec![
        "SELECT 'service_request'::text AS kind, r.id, \
                'Service request ' || r.request_number AS description, \
                r.status, r.total_amount AS amount, u.email AS user_email, r.created_at \
         FROM service_requests r JOIN users u ON u.id = r.user_id"
            .to_string(),
        "SELECT 'payment'::text, p.id, 'Payment ' || p.transaction_id, \
                p.status, p.amount, u.email, p.created_at \
         FROM payments p JOIN users u ON u.id = p.user_id"
            .to_string(),
        "SELECT 'user_registration'::text, u.id, \
                u.first_name || ' ' || u.last_name || ' registered', \
                NULL::text, NULL::bigint, u.email, u.created_at \
         FROM users u"
            .to_string(),
    ];
    for kind in DomainKind::ALL {
        branches.push(format!(
            "SELECT '{kind_tag}'::text, d.id, '{label}: ' || d.service_type, \
                    d.status, NULL::bigint, u.email, d.created_at \
             FROM {table} d JOIN users u ON u.id = d.user_id",
            kind_tag = kind.activity_kind(),
            label = kind.label(),
            table = kind.table(),
        ));
    }
    format!(
        "SELECT * FROM ({}) activity ORDER BY created_at DESC LIMIT $1",
        branches.join(" UNION ALL ")
    )
}

pub async fn recent_activities(
    state: &AppState,
    query: RecentActivityQuery,
) -> AppResult<ApiResponse<Vec<Activity>>> {
    let sql = recent_activity_sql();
    let activities = sqlx::query_as::<_, Activity>(&sql)
        .bind(query.normalized_limit())
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success("Recent activities", activities, None))
}

pub async fn list_payments(
    state: &AppState,
    query: AdminPaymentQuery,
) -> AppResult<ApiResponse<AdminPaymentList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status: PaymentStatus = status.to_lowercase().parse()?;
        condition = condition.add(PaymentCol::Status.eq(status.as_str()));
    }
    if let Some(method) = query.payment_method.as_deref().filter(|s| !s.trim().is_empty()) {
        let method = PaymentMethod::normalize(method)?;
        condition = condition.add(PaymentCol::PaymentMethod.eq(method.as_str()));
    }

    let total = Payments::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let items = Payments::find()
        .filter(condition)
        .order_by_desc(PaymentCol::CreatedAt)
        .find_also_related(Users)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(payment, user)| AdminPayment {
            payment: Payment::from(payment),
            user_email: user.map(|u| u.email),
        })
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        AdminPaymentList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn invoices(state: &AppState, pagination: Pagination) -> AppResult<ApiResponse<InvoiceList>> {
    let (page, limit, offset) = pagination.normalize();
    let successful = PaymentCol::Status.eq(PaymentStatus::Successful.as_str());

    let total = Payments::find()
        .filter(successful.clone())
        .count(&state.orm)
        .await? as i64;

    let items = Payments::find()
        .filter(successful)
        .order_by_desc(PaymentCol::PaidAt)
        .find_also_related(Users)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(payment, user)| Invoice {
            issued_at: payment.paid_at.unwrap_or(payment.created_at).with_timezone(&Utc),
            invoice_number: payment.invoice_number,
            payment_id: payment.id,
            transaction_id: payment.transaction_id,
            user_email: user.map(|u| u.email),
            service_type: payment.service_type,
            description: payment.description,
            amount: payment.amount,
            tax_amount: payment.tax_amount,
            currency: payment.currency,
        })
        .collect();

    Ok(ApiResponse::success(
        "Invoices",
        InvoiceList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn revenue_report(state: &AppState) -> AppResult<ApiResponse<RevenueReport>> {
    let pool = &state.pool;

    let (total_revenue, by_month, by_service_type) = tokio::try_join!(
        scalar(
            pool,
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payments WHERE status = 'successful'",
        ),
        sqlx::query_as::<_, MonthlyRevenue>(
            r#"
            SELECT to_char(date_trunc('month', COALESCE(paid_at, created_at)), 'YYYY-MM') AS month,
                   COALESCE(SUM(amount), 0)::BIGINT AS revenue,
                   COUNT(*) AS payments
            FROM payments
            WHERE status = 'successful'
              AND COALESCE(paid_at, created_at) >= date_trunc('month', now()) - interval '11 months'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(pool),
        sqlx::query_as::<_, ServiceTypeRevenue>(
            r#"
            SELECT service_type,
                   COALESCE(SUM(amount), 0)::BIGINT AS revenue,
                   COUNT(*) AS payments
            FROM payments
            WHERE status = 'successful'
            GROUP BY service_type
            ORDER BY revenue DESC
            "#,
        )
        .fetch_all(pool),
    )?;

    Ok(ApiResponse::success(
        "Revenue report",
        RevenueReport {
            total_revenue,
            by_month,
            by_service_type,
        },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_feed_reads_every_category_table() {
        let sql = recent_activity_sql();
        for kind in DomainKind::ALL {
            assert!(sql.contains(&format!("FROM {} d", kind.table())));
            assert!(sql.contains(&format!("'{}'::text", kind.activity_kind())));
        }
        assert!(sql.contains("FROM service_requests r"));
        assert!(sql.contains("FROM payments p"));
        assert_eq!(sql.matches(" UNION ALL ").count(), 6);
        assert!(sql.ends_with("LIMIT $1"));
    }

    #[test]
    fn summed_count_covers_every_request_table() {
        let sql = summed_count("WHERE status = 'pending'");
        for table in REQUEST_TABLES {
            assert!(sql.contains(&format!("FROM {table} WHERE status = 'pending'")));
        }
        assert!(sql.starts_with("SELECT ("));
        assert!(sql.ends_with(")::BIGINT"));
    }
}
