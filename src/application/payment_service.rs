use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{Payment, PaymentFilter, PaymentInput, PaymentStatus};
use crate::domain::ports::{Clock, IdGenerator, SalesStore};

/// Records standalone payments against open orders.
///
/// A payment never closes its order, even when it covers the total; only
/// `OrderService::close_order` does that.
pub struct PaymentService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<S: SalesStore> PaymentService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, clock, ids }
    }

    pub fn create_payment(
        &self,
        order_id: Uuid,
        cashier_id: Uuid,
        input: PaymentInput,
    ) -> Result<Payment, DomainError> {
        input.validate()?;

        let payment = self.store.transaction(|s| {
            let order = s
                .lock_order(order_id)?
                .ok_or_else(|| DomainError::order_not_found(order_id))?;
            if order.is_closed() {
                return Err(DomainError::InvalidState(
                    "cannot add payment to closed order".to_string(),
                ));
            }

            let mut payment = Payment {
                id: self.ids.new_id(),
                order_id,
                cashier_id,
                amount_cents: input.amount_cents,
                method: input.method,
                status: PaymentStatus::Pending,
                reference_number: input.reference_number,
                note: input.note,
                created_at: self.clock.now(),
                completed_at: None,
            };
            s.insert_payment(&payment)?;

            // Settlement is immediate; there is no asynchronous confirmation.
            let completed_at = self.clock.now();
            s.update_payment_status(payment.id, PaymentStatus::Completed, Some(completed_at))?;
            payment.status = PaymentStatus::Completed;
            payment.completed_at = Some(completed_at);
            Ok(payment)
        })?;

        info!(
            "Recorded {} payment {} of {} cents on order {}",
            payment.method, payment.id, payment.amount_cents, order_id
        );
        Ok(payment)
    }

    pub fn get_payment(&self, id: Uuid) -> Result<Payment, DomainError> {
        self.store
            .run(|s| s.find_payment(id))?
            .ok_or_else(|| DomainError::payment_not_found(id))
    }

    /// Matching payments, newest first.
    pub fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        self.store.run(|s| s.list_payments(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::order_service::OrderService;
    use crate::domain::order::{CloseOrder, CreateOrder, Order, OrderItemInput, OrderStatus};
    use crate::domain::payment::PaymentMethod;
    use crate::infrastructure::memory::{MemoryStore, StaticCatalog};
    use crate::infrastructure::system::{FixedClock, SequentialIds};
    use chrono::{TimeZone, Utc};

    struct Fixture {
        orders: OrderService<MemoryStore, StaticCatalog>,
        payments: PaymentService<MemoryStore>,
        clock: Arc<FixedClock>,
        product: Uuid,
    }

    fn fixture() -> Fixture {
        let product = Uuid::from_u128(0x1001);
        let store = MemoryStore::default();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()));
        let ids = Arc::new(SequentialIds::default());
        Fixture {
            orders: OrderService::new(
                store.clone(),
                StaticCatalog::new([(product, 1500)]),
                clock.clone(),
                ids.clone(),
            ),
            payments: PaymentService::new(store, clock.clone(), ids),
            clock,
            product,
        }
    }

    fn open_order(f: &Fixture) -> Order {
        f.orders
            .create_order(
                None,
                CreateOrder {
                    table_id: Uuid::from_u128(1),
                    venue_id: Uuid::from_u128(2),
                    items: vec![OrderItemInput {
                        product_id: f.product,
                        quantity: 2,
                        note: None,
                    }],
                    note: None,
                },
            )
            .unwrap()
    }

    fn payment(amount_cents: i64, method: PaymentMethod) -> PaymentInput {
        PaymentInput {
            amount_cents,
            method,
            reference_number: Some("REF-1".to_string()),
            note: None,
        }
    }

    #[test]
    fn create_payment_completes_immediately() {
        let f = fixture();
        let order = open_order(&f);
        let cashier = Uuid::from_u128(0xC1);

        let created = f
            .payments
            .create_payment(order.id, cashier, payment(1000, PaymentMethod::Card))
            .unwrap();

        assert_eq!(created.status, PaymentStatus::Completed);
        assert!(created.completed_at.is_some());
        assert_eq!(created.cashier_id, cashier);
        assert_eq!(f.payments.get_payment(created.id).unwrap(), created);
    }

    #[test]
    fn full_payment_does_not_close_the_order() {
        let f = fixture();
        let order = open_order(&f);

        f.payments
            .create_payment(order.id, Uuid::from_u128(0xC1), payment(3570, PaymentMethod::Cash))
            .unwrap();

        let after = f.orders.get_order(order.id).unwrap();
        assert_eq!(after.status, OrderStatus::Pending);
        assert_eq!(after.cashier_id, None);
        assert!(after.closed_at.is_none());
        assert_eq!(after.payments.len(), 1);
    }

    #[test]
    fn create_payment_rejects_unknown_and_closed_orders() {
        let f = fixture();
        let cashier = Uuid::from_u128(0xC1);
        assert!(matches!(
            f.payments
                .create_payment(Uuid::from_u128(99), cashier, payment(100, PaymentMethod::Cash)),
            Err(DomainError::NotFound(_))
        ));

        let order = open_order(&f);
        f.orders
            .close_order(
                order.id,
                cashier,
                CloseOrder {
                    payments: vec![payment(3570, PaymentMethod::Cash)],
                    note: None,
                },
            )
            .unwrap();

        let late = f
            .payments
            .create_payment(order.id, cashier, payment(100, PaymentMethod::Cash));
        assert!(matches!(late, Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn create_payment_rejects_non_positive_amounts() {
        let f = fixture();
        let order = open_order(&f);
        let result = f
            .payments
            .create_payment(order.id, Uuid::from_u128(0xC1), payment(0, PaymentMethod::Cash));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn get_payment_fails_for_unknown_id() {
        let f = fixture();
        assert!(matches!(
            f.payments.get_payment(Uuid::from_u128(5)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn list_payments_filters_and_orders_newest_first() {
        let f = fixture();
        let order = open_order(&f);
        let cashier = Uuid::from_u128(0xC1);

        let first = f
            .payments
            .create_payment(order.id, cashier, payment(100, PaymentMethod::Cash))
            .unwrap();
        f.clock.advance_secs(1);
        let second = f
            .payments
            .create_payment(order.id, cashier, payment(200, PaymentMethod::Card))
            .unwrap();

        let all = f
            .payments
            .list_payments(&PaymentFilter::for_order(order.id))
            .unwrap();
        let ids: Vec<Uuid> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let cards = f
            .payments
            .list_payments(&PaymentFilter {
                method: Some(PaymentMethod::Card),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, second.id);
    }
}
