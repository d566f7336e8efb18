use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::order::{Order, OrderStatus};
use super::payment::PaymentMethod;

/// Optional venue and creation-date window shared by every summary query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryFilter {
    pub venue_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl SummaryFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.venue_id.map_or(true, |v| order.venue_id == v)
            && self.created_from.map_or(true, |from| order.created_at >= from)
            && self.created_to.map_or(true, |to| order.created_at <= to)
    }
}

/// Count and sum of completed payments attached to matching orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentTotals {
    pub payments: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesSummary {
    pub total_orders: i64,
    pub total_revenue_cents: i64,
    pub total_payments: i64,
    pub by_payment_method: BTreeMap<PaymentMethod, i64>,
    pub by_status: BTreeMap<OrderStatus, i64>,
}
