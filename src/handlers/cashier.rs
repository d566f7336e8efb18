//! Cashier console: the settlement queue and per-order payments.
//! Both routes require the `cashier` or `admin` role.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::application::{OrderService, PaymentService};
use crate::domain::order::OrderFilter;
use crate::domain::page::Page;
use crate::domain::payment::PaymentInput;
use crate::domain::ports::{CatalogLookup, SalesStore};
use crate::domain::principal::{Principal, Role};
use crate::errors::AppError;

use super::auth::require_any_role;
use super::date_range;
use super::orders::{order_list, OrderResponse};
use super::payments::{PaymentLineRequest, PaymentResponse};

const CASHIER_ROLES: [Role; 2] = [Role::Cashier, Role::Admin];

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CashierOrdersParams {
    pub venue_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl CashierOrdersParams {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let (created_from, created_to) =
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok(OrderFilter {
            venue_id: self.venue_id,
            table_id: self.table_id,
            created_from,
            created_to,
            page: Page::resolve(self.limit, self.offset),
            ..Default::default()
        })
    }
}

/// GET /cashier/orders
///
/// Orders a cashier may settle (`pending`, `confirmed` or `ready`).
#[utoipa::path(
    get,
    path = "/cashier/orders",
    params(CashierOrdersParams),
    responses(
        (status = 200, description = "Orders awaiting settlement", body = [OrderResponse]),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller is not a cashier"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cashier"
)]
pub async fn cashier_orders<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    principal: Principal,
    query: web::Query<CashierOrdersParams>,
) -> Result<HttpResponse, AppError> {
    require_any_role(&principal, &CASHIER_ROLES)?;
    let filter = query.into_inner().into_filter()?;

    let orders = web::block(move || service.list_closable_orders(filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(order_list(orders)))
}

/// POST /cashier/orders/{id}/payments
#[utoipa::path(
    post,
    path = "/cashier/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = PaymentLineRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid amount or order already closed"),
        (status = 403, description = "Caller is not a cashier"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cashier"
)]
pub async fn process_payment<S: SalesStore>(
    service: web::Data<PaymentService<S>>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<PaymentLineRequest>,
) -> Result<HttpResponse, AppError> {
    require_any_role(&principal, &CASHIER_ROLES)?;
    let order_id = path.into_inner();
    let input = PaymentInput::from(body.into_inner());

    let payment = web::block(move || service.create_payment(order_id, principal.user_id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}
