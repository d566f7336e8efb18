use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::PaymentService;
use crate::domain::page::Page;
use crate::domain::payment::{Payment, PaymentFilter, PaymentInput, PaymentMethod, PaymentStatus};
use crate::domain::ports::SalesStore;
use crate::domain::principal::Principal;
use crate::errors::AppError;

use super::{date_range, parse_param};

// ── Request / response DTOs ──────────────────────────────────────────────────

/// One settlement, as sent when closing an order or paying from the cashier view.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentLineRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub note: Option<String>,
}

impl From<PaymentLineRequest> for PaymentInput {
    fn from(r: PaymentLineRequest) -> Self {
        PaymentInput {
            amount_cents: r.amount_cents,
            method: r.method,
            reference_number: r.reference_number,
            note: r.note,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub cashier_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            cashier_id: p.cashier_id,
            amount_cents: p.amount_cents,
            method: p.method,
            status: p.status,
            reference_number: p.reference_number,
            note: p.note,
            created_at: p.created_at,
            completed_at: p.completed_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPaymentsParams {
    pub order_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    /// `cash`, `card`, `transfer` or `other`.
    pub method: Option<String>,
    /// `pending`, `completed`, `failed` or `refunded`.
    pub status: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListPaymentsParams {
    pub fn into_filter(self) -> Result<PaymentFilter, AppError> {
        let (created_from, created_to) =
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok(PaymentFilter {
            order_id: self.order_id,
            cashier_id: self.cashier_id,
            method: parse_param(self.method.as_deref())?,
            status: parse_param(self.status.as_deref())?,
            created_from,
            created_to,
            page: Page::resolve(self.limit, self.offset),
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments
///
/// Records a completed payment against an open order for the calling
/// cashier. The order itself is left untouched.
#[utoipa::path(
    post,
    path = "/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid amount or order already closed"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn create_payment<S: SalesStore>(
    service: web::Data<PaymentService<S>>,
    principal: Principal,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order_id = body.order_id;
    let input = PaymentInput {
        amount_cents: body.amount_cents,
        method: body.method,
        reference_number: body.reference_number,
        note: body.note,
    };

    let payment = web::block(move || service.create_payment(order_id, principal.user_id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}

/// GET /payments
#[utoipa::path(
    get,
    path = "/payments",
    params(ListPaymentsParams),
    responses(
        (status = 200, description = "Matching payments, most recent first", body = [PaymentResponse]),
        (status = 400, description = "Malformed filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn list_payments<S: SalesStore>(
    service: web::Data<PaymentService<S>>,
    _principal: Principal,
    query: web::Query<ListPaymentsParams>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;

    let payments = web::block(move || service.list_payments(&filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /payments/{id}
#[utoipa::path(
    get,
    path = "/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment found", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn get_payment<S: SalesStore>(
    service: web::Data<PaymentService<S>>,
    _principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();

    let payment = web::block(move || service.get_payment(payment_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}
