use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Timestamptz, Uuid as SqlUuid};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderFilter, OrderItem, OrderStatus};
use crate::domain::payment::{Payment, PaymentFilter, PaymentMethod, PaymentStatus};
use crate::domain::ports::{CatalogLookup, OrderStore, PaymentStore, SalesSession, SalesStore};
use crate::domain::summary::{PaymentTotals, SummaryFilter};
use crate::schema::{order_items, orders, payments, products};

use super::models::{CountRow, KeyedCountRow, OrderItemRow, OrderRow, PaymentRow, PaymentTotalsRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Store(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Store(e.to_string())
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SalesStore for DieselStore {
    fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        f(&mut DieselSession { conn })
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, DomainError, _>(|conn| f(&mut DieselSession { conn }))
    }
}

/// One pooled connection, possibly inside an open transaction.
pub struct DieselSession<'c> {
    conn: &'c mut PgConnection,
}

/// Venue and creation-date predicates over `orders o`; binds $1..$3.
const ORDER_WINDOW: &str = "($1::uuid IS NULL OR o.venue_id = $1) \
     AND ($2::timestamptz IS NULL OR o.created_at >= $2) \
     AND ($3::timestamptz IS NULL OR o.created_at <= $3)";

macro_rules! windowed_query {
    ($sql:expr, $filter:expr) => {
        diesel::sql_query($sql)
            .bind::<Nullable<SqlUuid>, _>($filter.venue_id)
            .bind::<Nullable<Timestamptz>, _>($filter.created_from)
            .bind::<Nullable<Timestamptz>, _>($filter.created_to)
    };
}

impl OrderStore for DieselSession<'_> {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        diesel::insert_into(orders::table)
            .values(&OrderRow::from(order))
            .execute(self.conn)?;
        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut query = orders::table.select(OrderRow::as_select()).into_boxed();
        if let Some(venue_id) = filter.venue_id {
            query = query.filter(orders::venue_id.eq(venue_id));
        }
        if let Some(table_id) = filter.table_id {
            query = query.filter(orders::table_id.eq(table_id));
        }
        if let Some(waiter_id) = filter.waiter_id {
            query = query.filter(orders::waiter_id.eq(waiter_id));
        }
        if let Some(cashier_id) = filter.cashier_id {
            query = query.filter(orders::cashier_id.eq(cashier_id));
        }
        if !filter.statuses.is_empty() {
            let names: Vec<String> = filter
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            query = query.filter(orders::status.eq_any(names));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(orders::created_at.ge(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(orders::created_at.le(to));
        }

        query
            .order((orders::created_at.desc(), orders::id.desc()))
            .limit(filter.page.limit)
            .offset(filter.page.offset)
            .load::<OrderRow>(self.conn)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let updated = diesel::update(orders::table.find(order.id))
            .set((
                orders::status.eq(order.status.as_str()),
                orders::subtotal_cents.eq(order.subtotal_cents),
                orders::tax_cents.eq(order.tax_cents),
                orders::discount_cents.eq(order.discount_cents),
                orders::total_cents.eq(order.total_cents),
                orders::note.eq(order.note.as_deref()),
                orders::updated_at.eq(order.updated_at),
            ))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(DomainError::order_not_found(order.id));
        }
        Ok(())
    }

    fn mark_closed(
        &mut self,
        id: Uuid,
        cashier_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let closed = OrderStatus::Closed.as_str();
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id))
                .filter(orders::status.ne(closed)),
        )
        .set((
            orders::status.eq(closed),
            orders::cashier_id.eq(Some(cashier_id)),
            orders::closed_at.eq(Some(closed_at)),
            orders::updated_at.eq(closed_at),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn insert_items(&mut self, items: &[OrderItem]) -> Result<(), DomainError> {
        if items.is_empty() {
            return Ok(());
        }
        let rows: Vec<OrderItemRow> = items.iter().map(OrderItemRow::from).collect();
        diesel::insert_into(order_items::table)
            .values(&rows)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let rows = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .order(order_items::line_no.asc())
            .select(OrderItemRow::as_select())
            .load(self.conn)?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    fn delete_items(&mut self, order_id: Uuid) -> Result<usize, DomainError> {
        Ok(
            diesel::delete(order_items::table.filter(order_items::order_id.eq(order_id)))
                .execute(self.conn)?,
        )
    }

    fn count_orders(&mut self, filter: &SummaryFilter) -> Result<i64, DomainError> {
        let sql = format!("SELECT COUNT(*) AS count FROM orders o WHERE {ORDER_WINDOW}");
        let row: CountRow = windowed_query!(sql, filter).get_result(self.conn)?;
        Ok(row.count)
    }

    fn count_orders_by_status(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(OrderStatus, i64)>, DomainError> {
        let sql = format!(
            "SELECT o.status AS key, COUNT(*) AS count FROM orders o \
             WHERE {ORDER_WINDOW} GROUP BY o.status"
        );
        let rows: Vec<KeyedCountRow> = windowed_query!(sql, filter).load(self.conn)?;
        rows.into_iter()
            .map(|r| {
                let status = r
                    .key
                    .parse::<OrderStatus>()
                    .map_err(|_| DomainError::Store(format!("unexpected status '{}' in orders", r.key)))?;
                Ok((status, r.count))
            })
            .collect()
    }
}

impl PaymentStore for DieselSession<'_> {
    fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        diesel::insert_into(payments::table)
            .values(&PaymentRow::from(payment))
            .execute(self.conn)?;
        Ok(())
    }

    fn find_payment(&mut self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        payments::table
            .find(id)
            .select(PaymentRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Payment::try_from)
            .transpose()
    }

    fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        let mut query = payments::table.select(PaymentRow::as_select()).into_boxed();
        if let Some(order_id) = filter.order_id {
            query = query.filter(payments::order_id.eq(order_id));
        }
        if let Some(cashier_id) = filter.cashier_id {
            query = query.filter(payments::cashier_id.eq(cashier_id));
        }
        if let Some(method) = filter.method {
            query = query.filter(payments::method.eq(method.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(payments::status.eq(status.as_str()));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(payments::created_at.ge(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(payments::created_at.le(to));
        }

        query
            .order((payments::created_at.desc(), payments::id.desc()))
            .limit(filter.page.limit)
            .offset(filter.page.offset)
            .load::<PaymentRow>(self.conn)?
            .into_iter()
            .map(Payment::try_from)
            .collect()
    }

    fn find_payments_for_order(&mut self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        payments::table
            .filter(payments::order_id.eq(order_id))
            .select(PaymentRow::as_select())
            .order((payments::created_at.desc(), payments::id.desc()))
            .load::<PaymentRow>(self.conn)?
            .into_iter()
            .map(Payment::try_from)
            .collect()
    }

    fn update_payment_status(
        &mut self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(payments::table.find(id))
            .set((
                payments::status.eq(status.as_str()),
                payments::completed_at.eq(completed_at),
            ))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(DomainError::payment_not_found(id));
        }
        Ok(())
    }

    fn completed_payment_totals(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<PaymentTotals, DomainError> {
        let sql = format!(
            "SELECT COUNT(DISTINCT p.id) AS payments, \
                    COALESCE(SUM(p.amount_cents), 0)::BIGINT AS revenue_cents \
             FROM payments p JOIN orders o ON o.id = p.order_id \
             WHERE p.status = 'completed' AND {ORDER_WINDOW}"
        );
        let row: PaymentTotalsRow = windowed_query!(sql, filter).get_result(self.conn)?;
        Ok(PaymentTotals {
            payments: row.payments,
            revenue_cents: row.revenue_cents,
        })
    }

    fn completed_payments_by_method(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(PaymentMethod, i64)>, DomainError> {
        let sql = format!(
            "SELECT p.method AS key, COUNT(*) AS count \
             FROM payments p JOIN orders o ON o.id = p.order_id \
             WHERE p.status = 'completed' AND {ORDER_WINDOW} GROUP BY p.method"
        );
        let rows: Vec<KeyedCountRow> = windowed_query!(sql, filter).load(self.conn)?;
        rows.into_iter()
            .map(|r| {
                let method = r
                    .key
                    .parse::<PaymentMethod>()
                    .map_err(|_| DomainError::Store(format!("unexpected method '{}' in payments", r.key)))?;
                Ok((method, r.count))
            })
            .collect()
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Prices read from the shared `products` table. Inactive products are unknown.
#[derive(Clone)]
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogLookup for DieselCatalog {
    fn unit_price_cents(&self, product_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        products::table
            .filter(products::id.eq(product_id))
            .filter(products::is_active.eq(true))
            .select(products::price_cents)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| DomainError::product_not_found(product_id))
    }
}
