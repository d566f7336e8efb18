//! In-process adapters for the store and catalog ports.
//!
//! `MemoryStore` serialises every session behind one mutex and restores a
//! snapshot when a transaction fails, which gives it the same
//! all-or-nothing behaviour as the Postgres store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{self, Order, OrderFilter, OrderItem, OrderStatus};
use crate::domain::payment::{self, Payment, PaymentFilter, PaymentMethod, PaymentStatus};
use crate::domain::ports::{CatalogLookup, OrderStore, PaymentStore, SalesSession, SalesStore};
use crate::domain::summary::{PaymentTotals, SummaryFilter};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
    payments: Vec<Payment>,
}

#[derive(Debug, Default)]
pub struct MemorySession {
    tables: Tables,
    fail_item_inserts: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemorySession>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, MemorySession>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::Store("memory store lock poisoned".to_string()))
    }

    /// Makes every following item insert fail with a store error.
    pub fn fail_item_inserts(&self, fail: bool) {
        if let Ok(mut session) = self.lock() {
            session.fail_item_inserts = fail;
        }
    }

    pub fn order_count(&self) -> usize {
        self.lock().map(|s| s.tables.orders.len()).unwrap_or(0)
    }

    pub fn payment_count(&self) -> usize {
        self.lock().map(|s| s.tables.payments.len()).unwrap_or(0)
    }
}

impl SalesStore for MemoryStore {
    fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>,
    {
        let mut session = self.lock()?;
        f(&mut *session)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>,
    {
        let mut session = self.lock()?;
        let snapshot = session.tables.clone();
        let result = f(&mut *session);
        if result.is_err() {
            session.tables = snapshot;
        }
        result
    }
}

impl MemorySession {
    fn order_matches_summary(&self, order_id: Uuid, filter: &SummaryFilter) -> bool {
        self.tables
            .orders
            .get(&order_id)
            .is_some_and(|o| filter.matches(o))
    }
}

fn stored(order: &Order) -> Order {
    Order {
        items: vec![],
        payments: vec![],
        ..order.clone()
    }
}

impl OrderStore for MemorySession {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        if self.tables.orders.contains_key(&order.id) {
            return Err(DomainError::Store(format!("duplicate order id {}", order.id)));
        }
        self.tables.orders.insert(order.id, stored(order));
        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.orders.get(&id).cloned())
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        // The session mutex already excludes every other writer.
        self.find_order(id)
    }

    fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut rows: Vec<Order> = self
            .tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        rows.sort_by(order::newest_first);
        Ok(filter.page.slice(rows))
    }

    fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let row = self
            .tables
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| DomainError::order_not_found(order.id))?;
        row.status = order.status;
        row.subtotal_cents = order.subtotal_cents;
        row.tax_cents = order.tax_cents;
        row.discount_cents = order.discount_cents;
        row.total_cents = order.total_cents;
        row.note = order.note.clone();
        row.updated_at = order.updated_at;
        Ok(())
    }

    fn mark_closed(
        &mut self,
        id: Uuid,
        cashier_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        match self.tables.orders.get_mut(&id) {
            Some(row) if !row.is_closed() => {
                row.status = OrderStatus::Closed;
                row.cashier_id = Some(cashier_id);
                row.closed_at = Some(closed_at);
                row.updated_at = closed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_items(&mut self, items: &[OrderItem]) -> Result<(), DomainError> {
        if self.fail_item_inserts {
            return Err(DomainError::Store("order_items rejected the insert".to_string()));
        }
        self.tables.items.extend_from_slice(items);
        Ok(())
    }

    fn find_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let mut items: Vec<OrderItem> = self
            .tables
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.line_no);
        Ok(items)
    }

    fn delete_items(&mut self, order_id: Uuid) -> Result<usize, DomainError> {
        let before = self.tables.items.len();
        self.tables.items.retain(|i| i.order_id != order_id);
        Ok(before - self.tables.items.len())
    }

    fn count_orders(&mut self, filter: &SummaryFilter) -> Result<i64, DomainError> {
        Ok(self
            .tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .count() as i64)
    }

    fn count_orders_by_status(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(OrderStatus, i64)>, DomainError> {
        let mut counts: BTreeMap<OrderStatus, i64> = BTreeMap::new();
        for order in self.tables.orders.values().filter(|o| filter.matches(o)) {
            *counts.entry(order.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

impl PaymentStore for MemorySession {
    fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        if !self.tables.orders.contains_key(&payment.order_id) {
            return Err(DomainError::Store(format!(
                "payment references missing order {}",
                payment.order_id
            )));
        }
        self.tables.payments.push(payment.clone());
        Ok(())
    }

    fn find_payment(&mut self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        Ok(self.tables.payments.iter().find(|p| p.id == id).cloned())
    }

    fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        let mut rows: Vec<Payment> = self
            .tables
            .payments
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(payment::newest_first);
        Ok(filter.page.slice(rows))
    }

    fn find_payments_for_order(&mut self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let mut rows: Vec<Payment> = self
            .tables
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        rows.sort_by(payment::newest_first);
        Ok(rows)
    }

    fn update_payment_status(
        &mut self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let row = self
            .tables
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::payment_not_found(id))?;
        row.status = status;
        row.completed_at = completed_at;
        Ok(())
    }

    fn completed_payment_totals(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<PaymentTotals, DomainError> {
        let mut totals = PaymentTotals::default();
        for p in &self.tables.payments {
            if p.status == PaymentStatus::Completed && self.order_matches_summary(p.order_id, filter) {
                totals.payments += 1;
                totals.revenue_cents += p.amount_cents;
            }
        }
        Ok(totals)
    }

    fn completed_payments_by_method(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(PaymentMethod, i64)>, DomainError> {
        let mut counts: BTreeMap<PaymentMethod, i64> = BTreeMap::new();
        for p in &self.tables.payments {
            if p.status == PaymentStatus::Completed && self.order_matches_summary(p.order_id, filter) {
                *counts.entry(p.method).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}

/// A fixed price list.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    prices: HashMap<Uuid, i64>,
}

impl StaticCatalog {
    pub fn new<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, i64)>,
    {
        Self {
            prices: prices.into_iter().collect(),
        }
    }
}

impl CatalogLookup for StaticCatalog {
    fn unit_price_cents(&self, product_id: Uuid) -> Result<i64, DomainError> {
        self.prices
            .get(&product_id)
            .copied()
            .ok_or_else(|| DomainError::product_not_found(product_id))
    }
}
