use log::debug;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderFilter, OrderStatus};
use crate::domain::ports::SalesStore;
use crate::domain::summary::{SalesSummary, SummaryFilter};

use super::order_service::load_orders;

/// Read-only revenue and order-count rollups.
///
/// The individual counts are separate queries and are not read from one
/// snapshot; concurrent writes may skew them against each other.
pub struct SummaryService<S> {
    store: S,
}

impl<S: SalesStore> SummaryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn sales_summary(&self, filter: &SummaryFilter) -> Result<SalesSummary, DomainError> {
        let summary = self.store.run(|s| {
            let total_orders = s.count_orders(filter)?;
            let totals = s.completed_payment_totals(filter)?;
            let by_payment_method = s.completed_payments_by_method(filter)?.into_iter().collect();
            let by_status = s.count_orders_by_status(filter)?.into_iter().collect();
            Ok(SalesSummary {
                total_orders,
                total_revenue_cents: totals.revenue_cents,
                total_payments: totals.payments,
                by_payment_method,
                by_status,
            })
        })?;
        debug!(
            "Sales summary: {} order(s), {} cents over {} payment(s)",
            summary.total_orders, summary.total_revenue_cents, summary.total_payments
        );
        Ok(summary)
    }

    /// Closed orders matching `filter`; any status in the filter is replaced.
    pub fn sales_history(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let filter = OrderFilter {
            statuses: vec![OrderStatus::Closed],
            ..filter
        };
        load_orders(&self.store, &filter)
    }
}
