use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{Order, OrderFilter, OrderItem, OrderStatus};
use super::payment::{Payment, PaymentFilter, PaymentMethod, PaymentStatus};
use super::summary::{PaymentTotals, SummaryFilter};

/// Unit prices for products. Unknown products fail with `NotFound`.
pub trait CatalogLookup: Send + Sync + 'static {
    fn unit_price_cents(&self, product_id: Uuid) -> Result<i64, DomainError>;
}

/// Persistence for orders and their items.
///
/// Orders are returned with empty `items` and `payments`.
pub trait OrderStore {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError>;
    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    /// Like `find_order`, but holds the row until the surrounding
    /// transaction ends so that concurrent writers queue behind it.
    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError>;
    /// Writes status, money fields, note and `updated_at`.
    fn update_order(&mut self, order: &Order) -> Result<(), DomainError>;
    /// Flips a not-yet-closed order to `closed`. Returns `false` when the
    /// order was already closed (or does not exist).
    fn mark_closed(
        &mut self,
        id: Uuid,
        cashier_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    fn insert_items(&mut self, items: &[OrderItem]) -> Result<(), DomainError>;
    /// Items of one order, by line number.
    fn find_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError>;
    fn delete_items(&mut self, order_id: Uuid) -> Result<usize, DomainError>;

    fn count_orders(&mut self, filter: &SummaryFilter) -> Result<i64, DomainError>;
    fn count_orders_by_status(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(OrderStatus, i64)>, DomainError>;
}

/// Persistence for payments.
pub trait PaymentStore {
    fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError>;
    fn find_payment(&mut self, id: Uuid) -> Result<Option<Payment>, DomainError>;
    fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError>;
    /// Every payment of one order, newest first, without a page limit.
    fn find_payments_for_order(&mut self, order_id: Uuid) -> Result<Vec<Payment>, DomainError>;
    fn update_payment_status(
        &mut self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError>;

    fn completed_payment_totals(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<PaymentTotals, DomainError>;
    fn completed_payments_by_method(
        &mut self,
        filter: &SummaryFilter,
    ) -> Result<Vec<(PaymentMethod, i64)>, DomainError>;
}

/// A connection-scoped view of both stores.
pub trait SalesSession: OrderStore + PaymentStore {}

impl<T: OrderStore + PaymentStore> SalesSession for T {}

/// Hands out sessions. `run` commits each statement on its own;
/// `transaction` commits everything `f` did, or nothing if it fails.
pub trait SalesStore: Send + Sync + 'static {
    fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>;

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn SalesSession) -> Result<T, DomainError>;
}

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

pub trait IdGenerator: Send + Sync + 'static {
    fn new_id(&self) -> Uuid;

    /// Human-readable `ORD-YYYYMMDD-HHMMSS-xxxx` number.
    fn order_number(&self, at: DateTime<Utc>) -> String {
        let suffix: String = self.new_id().simple().to_string().chars().take(4).collect();
        format!("ORD-{}-{}", at.format("%Y%m%d-%H%M%S"), suffix)
    }
}
