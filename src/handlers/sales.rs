use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::SummaryService;
use crate::domain::order::OrderFilter;
use crate::domain::page::Page;
use crate::domain::ports::SalesStore;
use crate::domain::principal::Principal;
use crate::domain::summary::{SalesSummary, SummaryFilter};
use crate::errors::AppError;

use super::date_range;
use super::orders::{order_list, OrderResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesHistoryParams {
    pub venue_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub waiter_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SalesHistoryParams {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let (created_from, created_to) =
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok(OrderFilter {
            venue_id: self.venue_id,
            table_id: self.table_id,
            waiter_id: self.waiter_id,
            cashier_id: self.cashier_id,
            statuses: vec![],
            created_from,
            created_to,
            page: Page::resolve(self.limit, self.offset),
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesSummaryParams {
    pub venue_id: Option<Uuid>,
    /// Inclusive, `YYYY-MM-DD`; applies to order creation time.
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`; applies to order creation time.
    pub end_date: Option<String>,
}

impl SalesSummaryParams {
    pub fn into_filter(self) -> Result<SummaryFilter, AppError> {
        let (created_from, created_to) =
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok(SummaryFilter {
            venue_id: self.venue_id,
            created_from,
            created_to,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummaryResponse {
    pub total_orders: i64,
    pub total_revenue_cents: i64,
    pub total_payments: i64,
    /// Completed payments per method, e.g. `{"cash": 3}`.
    pub by_payment_method: BTreeMap<String, i64>,
    /// Orders per status, e.g. `{"closed": 2}`.
    pub by_status: BTreeMap<String, i64>,
}

impl From<SalesSummary> for SalesSummaryResponse {
    fn from(s: SalesSummary) -> Self {
        Self {
            total_orders: s.total_orders,
            total_revenue_cents: s.total_revenue_cents,
            total_payments: s.total_payments,
            by_payment_method: s
                .by_payment_method
                .into_iter()
                .map(|(m, n)| (m.as_str().to_string(), n))
                .collect(),
            by_status: s
                .by_status
                .into_iter()
                .map(|(st, n)| (st.as_str().to_string(), n))
                .collect(),
        }
    }
}

/// GET /sales/history
///
/// Closed orders with their items, most recent first.
#[utoipa::path(
    get,
    path = "/sales/history",
    params(SalesHistoryParams),
    responses(
        (status = 200, description = "Closed orders", body = [OrderResponse]),
        (status = 400, description = "Malformed filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sales"
)]
pub async fn sales_history<S: SalesStore>(
    service: web::Data<SummaryService<S>>,
    _principal: Principal,
    query: web::Query<SalesHistoryParams>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;

    let orders = web::block(move || service.sales_history(filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(order_list(orders)))
}

/// GET /sales/summary
#[utoipa::path(
    get,
    path = "/sales/summary",
    params(SalesSummaryParams),
    responses(
        (status = 200, description = "Order and revenue rollup", body = SalesSummaryResponse),
        (status = 400, description = "Malformed filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sales"
)]
pub async fn sales_summary<S: SalesStore>(
    service: web::Data<SummaryService<S>>,
    _principal: Principal,
    query: web::Query<SalesSummaryParams>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;

    let summary = web::block(move || service.sales_summary(&filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SalesSummaryResponse::from(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::payment::PaymentMethod;

    #[test]
    fn summary_maps_use_wire_names() {
        let summary = SalesSummary {
            total_orders: 1,
            total_revenue_cents: 3570,
            total_payments: 1,
            by_payment_method: [(PaymentMethod::Cash, 1)].into_iter().collect(),
            by_status: [(OrderStatus::Closed, 1)].into_iter().collect(),
        };
        let body = serde_json::to_value(SalesSummaryResponse::from(summary)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "total_orders": 1,
                "total_revenue_cents": 3570,
                "total_payments": 1,
                "by_payment_method": {"cash": 1},
                "by_status": {"closed": 1},
            })
        );
    }

    #[test]
    fn summary_params_reject_bad_dates() {
        let result = SalesSummaryParams {
            end_date: Some("yesterday".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
