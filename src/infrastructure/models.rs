use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderItem};
use crate::domain::payment::Payment;
use crate::schema::{order_items, orders, payments};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub table_id: Uuid,
    pub venue_id: Uuid,
    pub waiter_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub cashier_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub reference_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ── Aggregate rows (raw SQL) ─────────────────────────────────────────────────

#[derive(Debug, QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(Debug, QueryableByName)]
pub struct KeyedCountRow {
    #[diesel(sql_type = Text)]
    pub key: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(Debug, QueryableByName)]
pub struct PaymentTotalsRow {
    #[diesel(sql_type = BigInt)]
    pub payments: i64,
    #[diesel(sql_type = BigInt)]
    pub revenue_cents: i64,
}

// ── Row <-> domain conversions ───────────────────────────────────────────────

fn corrupt(table: &str, column: &str, value: &str) -> DomainError {
    DomainError::Store(format!("unexpected {column} '{value}' in {table}"))
}

impl From<&Order> for OrderRow {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number.clone(),
            table_id: o.table_id,
            venue_id: o.venue_id,
            waiter_id: o.waiter_id,
            cashier_id: o.cashier_id,
            status: o.status.as_str().to_string(),
            subtotal_cents: o.subtotal_cents,
            tax_cents: o.tax_cents,
            discount_cents: o.discount_cents,
            total_cents: o.total_cents,
            note: o.note.clone(),
            created_at: o.created_at,
            updated_at: o.updated_at,
            closed_at: o.closed_at,
        }
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| corrupt("orders", "status", &row.status))?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            table_id: row.table_id,
            venue_id: row.venue_id,
            waiter_id: row.waiter_id,
            cashier_id: row.cashier_id,
            status,
            subtotal_cents: row.subtotal_cents,
            tax_cents: row.tax_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
            items: vec![],
            payments: vec![],
        })
    }
}

impl From<&OrderItem> for OrderItemRow {
    fn from(i: &OrderItem) -> Self {
        Self {
            id: i.id,
            order_id: i.order_id,
            line_no: i.line_no,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price_cents: i.unit_price_cents,
            subtotal_cents: i.subtotal_cents,
            note: i.note.clone(),
            created_at: i.created_at,
        }
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            line_no: row.line_no,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            subtotal_cents: row.subtotal_cents,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

impl From<&Payment> for PaymentRow {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            cashier_id: p.cashier_id,
            amount_cents: p.amount_cents,
            method: p.method.as_str().to_string(),
            status: p.status.as_str().to_string(),
            reference_number: p.reference_number.clone(),
            note: p.note.clone(),
            created_at: p.created_at,
            completed_at: p.completed_at,
        }
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let method = row
            .method
            .parse()
            .map_err(|_| corrupt("payments", "method", &row.method))?;
        let status = row
            .status
            .parse()
            .map_err(|_| corrupt("payments", "status", &row.status))?;
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            cashier_id: row.cashier_id,
            amount_cents: row.amount_cents,
            method,
            status,
            reference_number: row.reference_number,
            note: row.note,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payment_row(method: &str) -> PaymentRow {
        PaymentRow {
            id: Uuid::from_u128(1),
            order_id: Uuid::from_u128(2),
            cashier_id: Uuid::from_u128(3),
            amount_cents: 500,
            method: method.to_string(),
            status: "completed".to_string(),
            reference_number: None,
            note: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    #[test]
    fn payment_row_converts_to_domain() {
        let payment = Payment::try_from(payment_row("card")).unwrap();
        assert_eq!(payment.method, crate::domain::payment::PaymentMethod::Card);
        assert_eq!(PaymentRow::from(&payment).method, "card");
    }

    #[test]
    fn unknown_stored_values_are_store_errors() {
        let err = Payment::try_from(payment_row("barter")).unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }
}
