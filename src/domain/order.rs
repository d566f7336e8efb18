use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Totals;
use super::page::Page;
use super::payment::{Payment, PaymentInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    Closed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Closed,
    ];

    /// Statuses a cashier may settle from.
    pub const CLOSABLE: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Ready,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Position within the order, starting at 1.
    pub line_no: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order together with whatever related collections were loaded.
///
/// Stores return orders with empty `items` and `payments`; the services
/// fill them in when composing a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
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
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

impl Order {
    pub fn apply_totals(&mut self, totals: Totals) {
        self.subtotal_cents = totals.subtotal_cents;
        self.tax_cents = totals.tax_cents;
        self.discount_cents = totals.discount_cents;
        self.total_cents = totals.total_cents;
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One requested line of a create or update command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub table_id: Uuid,
    pub venue_id: Uuid,
    pub items: Vec<OrderItemInput>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub status: Option<OrderStatus>,
    pub items: Option<Vec<OrderItemInput>>,
    pub discount_cents: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloseOrder {
    pub payments: Vec<PaymentInput>,
    pub note: Option<String>,
}

pub fn validate_items(items: &[OrderItemInput]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::Validation(
            "an order needs at least one item".to_string(),
        ));
    }
    if let Some(bad) = items.iter().find(|item| item.quantity < 1) {
        return Err(DomainError::Validation(format!(
            "quantity for product {} must be at least 1, got {}",
            bad.product_id, bad.quantity
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub venue_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub waiter_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    /// Empty means any status.
    pub statuses: Vec<OrderStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: Page,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.venue_id.map_or(true, |v| order.venue_id == v)
            && self.table_id.map_or(true, |t| order.table_id == t)
            && self.waiter_id.map_or(true, |w| order.waiter_id == Some(w))
            && self.cashier_id.map_or(true, |c| order.cashier_id == Some(c))
            && (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self.created_from.map_or(true, |from| order.created_at >= from)
            && self.created_to.map_or(true, |to| order.created_at <= to)
    }
}

/// Most recent first, ties broken by id.
pub fn newest_first(a: &Order, b: &Order) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
