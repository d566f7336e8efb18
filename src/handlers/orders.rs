use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::OrderService;
use crate::domain::order::{
    CloseOrder, CreateOrder, Order, OrderFilter, OrderItem, OrderItemInput, OrderStatus,
    UpdateOrder,
};
use crate::domain::page::Page;
use crate::domain::ports::{CatalogLookup, SalesStore};
use crate::domain::principal::Principal;
use crate::errors::AppError;

use super::payments::{PaymentLineRequest, PaymentResponse};
use super::{date_range, parse_param};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub note: Option<String>,
}

impl From<OrderItemRequest> for OrderItemInput {
    fn from(r: OrderItemRequest) -> Self {
        OrderItemInput {
            product_id: r.product_id,
            quantity: r.quantity,
            note: r.note,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub table_id: Uuid,
    pub venue_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    /// Replaces every item when present and non-empty.
    pub items: Option<Vec<OrderItemRequest>>,
    pub discount_cents: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseOrderRequest {
    pub payments: Vec<PaymentLineRequest>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price_cents: i.unit_price_cents,
            subtotal_cents: i.subtotal_cents,
            note: i.note,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub table_id: Uuid,
    pub venue_id: Uuid,
    pub waiter_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    /// Only filled by single-order reads.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payments: Vec<PaymentResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            table_id: o.table_id,
            venue_id: o.venue_id,
            waiter_id: o.waiter_id,
            cashier_id: o.cashier_id,
            status: o.status,
            subtotal_cents: o.subtotal_cents,
            tax_cents: o.tax_cents,
            discount_cents: o.discount_cents,
            total_cents: o.total_cents,
            note: o.note,
            created_at: o.created_at,
            updated_at: o.updated_at,
            closed_at: o.closed_at,
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
            payments: o.payments.into_iter().map(PaymentResponse::from).collect(),
        }
    }
}

pub(crate) fn order_list(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

// ── Filtering ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    pub venue_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub waiter_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    /// One of the order statuses, e.g. `pending`.
    pub status: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Defaults to 100; non-positive values fall back to the default.
    pub limit: Option<i64>,
    /// Defaults to 0; non-positive values fall back to the default.
    pub offset: Option<i64>,
}

impl ListOrdersParams {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let (created_from, created_to) =
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        let statuses = parse_param::<OrderStatus>(self.status.as_deref())?
            .into_iter()
            .collect();
        Ok(OrderFilter {
            venue_id: self.venue_id,
            table_id: self.table_id,
            waiter_id: self.waiter_id,
            cashier_id: self.cashier_id,
            statuses,
            created_from,
            created_to,
            page: Page::resolve(self.limit, self.offset),
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Opens an order for the calling waiter. Items are priced from the catalog
/// and the order is written together with its items in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid items"),
        (status = 401, description = "Missing caller identity"),
        (status = 404, description = "Unknown product"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    principal: Principal,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let cmd = CreateOrder {
        table_id: body.table_id,
        venue_id: body.venue_id,
        items: body.items.into_iter().map(OrderItemInput::from).collect(),
        note: body.note,
    };

    let order = web::block(move || service.create_order(Some(principal.user_id), cmd))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Orders with their items, most recent first. Payments are not included.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Matching orders", body = [OrderResponse]),
        (status = 400, description = "Malformed filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    _principal: Principal,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;

    let orders = web::block(move || service.list_orders(&filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(order_list(orders)))
}

/// GET /orders/{id}
///
/// Returns the order together with its items and payments.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    _principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}
#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid update or order already closed"),
        (status = 404, description = "Order or product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    _principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let cmd = UpdateOrder {
        status: body.status,
        items: body
            .items
            .map(|items| items.into_iter().map(OrderItemInput::from).collect()),
        discount_cents: body.discount_cents,
        note: body.note,
    };

    let order = web::block(move || service.update_order(order_id, cmd))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/close
///
/// Settles the order with the given payments on behalf of the calling
/// cashier. Nothing is recorded unless the payments cover the total.
#[utoipa::path(
    post,
    path = "/orders/{id}/close",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = CloseOrderRequest,
    responses(
        (status = 200, description = "Order closed", body = OrderResponse),
        (status = 400, description = "Already closed or insufficient payment"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn close_order<S: SalesStore, C: CatalogLookup>(
    service: web::Data<OrderService<S, C>>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<CloseOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let cmd = CloseOrder {
        payments: body.payments.into_iter().map(Into::into).collect(),
        note: body.note,
    };

    let order = web::block(move || service.close_order(order_id, principal.user_id, cmd))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
