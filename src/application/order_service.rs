use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::money::{line_subtotal, sum_cents, tax_for, Totals};
use crate::domain::order::{
    validate_items, CloseOrder, CreateOrder, Order, OrderFilter, OrderItem, OrderItemInput,
    OrderStatus, UpdateOrder,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{CatalogLookup, Clock, IdGenerator, SalesSession, SalesStore};

/// Owns the order lifecycle: creation, mutation and close-with-settlement.
pub struct OrderService<S, C> {
    store: S,
    catalog: C,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<S: SalesStore, C: CatalogLookup> OrderService<S, C> {
    pub fn new(store: S, catalog: C, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            catalog,
            clock,
            ids,
        }
    }

    pub fn create_order(&self, waiter_id: Option<Uuid>, cmd: CreateOrder) -> Result<Order, DomainError> {
        validate_items(&cmd.items)?;

        let now = self.clock.now();
        let order_id = self.ids.new_id();
        let items = self.price_items(order_id, &cmd.items, now)?;
        let subtotal = sum_cents(items.iter().map(|i| i.subtotal_cents))?;

        let mut order = Order {
            id: order_id,
            order_number: self.ids.order_number(now),
            table_id: cmd.table_id,
            venue_id: cmd.venue_id,
            waiter_id,
            cashier_id: None,
            status: OrderStatus::Pending,
            subtotal_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            note: cmd.note,
            created_at: now,
            updated_at: now,
            closed_at: None,
            items: vec![],
            payments: vec![],
        };
        order.apply_totals(Totals::from_subtotal(subtotal)?);

        self.store.transaction(|s| {
            s.insert_order(&order)?;
            s.insert_items(&items)
        })?;

        info!(
            "Created order {} ({}) with {} item(s), total {} cents",
            order.order_number,
            order.id,
            items.len(),
            order.total_cents
        );
        order.items = items;
        Ok(order)
    }

    /// The order with its items and payments.
    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.store.run(|s| {
            let order = s
                .find_order(id)?
                .ok_or_else(|| DomainError::order_not_found(id))?;
            let mut order = attach_items(s, order);
            match s.find_payments_for_order(id) {
                Ok(payments) => order.payments = payments,
                Err(e) => warn!("Could not load payments of order {id}: {e}"),
            }
            Ok(order)
        })
    }

    /// Matching orders with their items, newest first. Payments are not loaded.
    pub fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        load_orders(&self.store, filter)
    }

    /// Orders a cashier can still settle.
    pub fn list_closable_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let filter = OrderFilter {
            statuses: OrderStatus::CLOSABLE.to_vec(),
            ..filter
        };
        load_orders(&self.store, &filter)
    }

    pub fn update_order(&self, id: Uuid, cmd: UpdateOrder) -> Result<Order, DomainError> {
        if cmd.status == Some(OrderStatus::Closed) {
            return Err(DomainError::InvalidState(
                "orders are closed through settlement, not by status update".to_string(),
            ));
        }
        if let Some(discount) = cmd.discount_cents {
            if discount < 0 {
                return Err(DomainError::Validation(format!(
                    "discount must not be negative, got {discount}"
                )));
            }
        }

        let now = self.clock.now();
        let new_items = match cmd.items.as_deref() {
            Some(inputs) if !inputs.is_empty() => {
                validate_items(inputs)?;
                Some(self.price_items(id, inputs, now)?)
            }
            _ => None,
        };

        self.store.transaction(|s| {
            let mut order = s
                .lock_order(id)?
                .ok_or_else(|| DomainError::order_not_found(id))?;
            if order.is_closed() {
                return Err(DomainError::InvalidState(format!(
                    "order {} is closed",
                    order.order_number
                )));
            }

            if let Some(status) = cmd.status {
                order.status = status;
            }

            let (mut subtotal, mut tax) = (order.subtotal_cents, order.tax_cents);
            if let Some(items) = &new_items {
                let removed = s.delete_items(id)?;
                s.insert_items(items)?;
                debug!("Replaced {removed} item(s) of order {id} with {}", items.len());
                subtotal = sum_cents(items.iter().map(|i| i.subtotal_cents))?;
                tax = tax_for(subtotal);
            }

            let discount = cmd.discount_cents.unwrap_or(order.discount_cents);
            let totals = Totals::new(subtotal, tax, discount)?;
            if discount > totals.max_discount() {
                return Err(DomainError::Validation(format!(
                    "discount of {discount} cents exceeds the order amount of {} cents",
                    totals.max_discount()
                )));
            }
            order.apply_totals(totals);

            if let Some(note) = &cmd.note {
                order.note = Some(note.clone());
            }
            order.updated_at = now;
            s.update_order(&order)
        })?;

        info!("Updated order {id}");
        self.get_order(id)
    }

    /// Records the given payments and closes the order, all or nothing.
    pub fn close_order(&self, id: Uuid, cashier_id: Uuid, cmd: CloseOrder) -> Result<Order, DomainError> {
        if cmd.payments.is_empty() {
            return Err(DomainError::Validation(
                "closing an order needs at least one payment".to_string(),
            ));
        }
        for payment in &cmd.payments {
            payment.validate()?;
        }

        let now = self.clock.now();
        let paid = self.store.transaction(|s| {
            let mut order = s
                .lock_order(id)?
                .ok_or_else(|| DomainError::order_not_found(id))?;
            if order.is_closed() {
                return Err(DomainError::InvalidState(format!(
                    "order {} is already closed",
                    order.order_number
                )));
            }

            let mut paid: i64 = 0;
            for input in &cmd.payments {
                s.insert_payment(&Payment {
                    id: self.ids.new_id(),
                    order_id: id,
                    cashier_id,
                    amount_cents: input.amount_cents,
                    method: input.method,
                    status: PaymentStatus::Completed,
                    reference_number: input.reference_number.clone(),
                    note: input.note.clone(),
                    created_at: now,
                    completed_at: Some(now),
                })?;
                paid = sum_cents([paid, input.amount_cents])?;
            }

            if paid < order.total_cents {
                return Err(DomainError::InsufficientPayment {
                    expected: order.total_cents,
                    paid,
                });
            }

            if let Some(note) = &cmd.note {
                order.note = Some(note.clone());
                order.updated_at = now;
                s.update_order(&order)?;
            }
            if !s.mark_closed(id, cashier_id, now)? {
                return Err(DomainError::InvalidState(format!(
                    "order {} was closed concurrently",
                    order.order_number
                )));
            }
            Ok(paid)
        })?;

        info!("Closed order {id} by cashier {cashier_id}, paid {paid} cents");
        self.get_order(id)
    }

    fn price_items(
        &self,
        order_id: Uuid,
        inputs: &[OrderItemInput],
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderItem>, DomainError> {
        inputs
            .iter()
            .zip(1..)
            .map(|(input, line_no)| {
                let unit_price_cents = self.catalog.unit_price_cents(input.product_id)?;
                Ok(OrderItem {
                    id: self.ids.new_id(),
                    order_id,
                    line_no,
                    product_id: input.product_id,
                    quantity: input.quantity,
                    unit_price_cents,
                    subtotal_cents: line_subtotal(input.quantity, unit_price_cents)?,
                    note: input.note.clone(),
                    created_at: now,
                })
            })
            .collect()
    }
}

/// Lists orders and attaches their items. Item loading is best effort: an
/// order whose items fail to load is still returned, without items.
pub(crate) fn load_orders<S: SalesStore>(
    store: &S,
    filter: &OrderFilter,
) -> Result<Vec<Order>, DomainError> {
    store.run(|s| {
        let orders = s.list_orders(filter)?;
        Ok(orders.into_iter().map(|o| attach_items(s, o)).collect())
    })
}

fn attach_items(s: &mut dyn SalesSession, mut order: Order) -> Order {
    match s.find_items(order.id) {
        Ok(items) => order.items = items,
        Err(e) => warn!("Could not load items of order {}: {e}", order.id),
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CloseOrder;
    use crate::domain::payment::{PaymentInput, PaymentMethod};
    use crate::infrastructure::memory::{MemoryStore, StaticCatalog};
    use crate::infrastructure::system::{FixedClock, SequentialIds};
    use chrono::TimeZone;

    const P1_PRICE: i64 = 1500;

    struct Fixture {
        service: OrderService<MemoryStore, StaticCatalog>,
        store: MemoryStore,
        clock: Arc<FixedClock>,
        p1: Uuid,
        p2: Uuid,
    }

    fn fixture() -> Fixture {
        let p1 = Uuid::from_u128(0x1001);
        let p2 = Uuid::from_u128(0x1002);
        let catalog = StaticCatalog::new([(p1, P1_PRICE), (p2, 250)]);
        let store = MemoryStore::default();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()));
        let service = OrderService::new(
            store.clone(),
            catalog,
            clock.clone(),
            Arc::new(SequentialIds::default()),
        );
        Fixture {
            service,
            store,
            clock,
            p1,
            p2,
        }
    }

    fn item(product_id: Uuid, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            product_id,
            quantity,
            note: None,
        }
    }

    fn cash(amount_cents: i64) -> PaymentInput {
        PaymentInput {
            amount_cents,
            method: PaymentMethod::Cash,
            reference_number: None,
            note: None,
        }
    }

    fn create(f: &Fixture, items: Vec<OrderItemInput>) -> Order {
        f.service
            .create_order(
                Some(Uuid::from_u128(0xA1)),
                CreateOrder {
                    table_id: Uuid::from_u128(0x71),
                    venue_id: Uuid::from_u128(0x91),
                    items,
                    note: None,
                },
            )
            .expect("create failed")
    }

    fn assert_total_invariant(order: &Order) {
        assert_eq!(
            order.total_cents,
            order.subtotal_cents + order.tax_cents - order.discount_cents
        );
        assert_eq!(order.tax_cents, tax_for(order.subtotal_cents));
    }

    #[test]
    fn create_order_prices_items_and_derives_totals() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);

        assert_eq!(order.subtotal_cents, 3000);
        assert_eq!(order.tax_cents, 570);
        assert_eq!(order.discount_cents, 0);
        assert_eq!(order.total_cents, 3570);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.cashier_id, None);
        assert!(order.order_number.starts_with("ORD-20240501-200000-"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price_cents, P1_PRICE);
        assert_eq!(order.items[0].subtotal_cents, 3000);
        assert_total_invariant(&order);
    }

    #[test]
    fn create_order_rejects_bad_items_without_writing() {
        let f = fixture();
        let empty = f.service.create_order(
            None,
            CreateOrder {
                table_id: Uuid::nil(),
                venue_id: Uuid::nil(),
                items: vec![],
                note: None,
            },
        );
        assert!(matches!(empty, Err(DomainError::Validation(_))));

        let unknown = f.service.create_order(
            None,
            CreateOrder {
                table_id: Uuid::nil(),
                venue_id: Uuid::nil(),
                items: vec![item(f.p1, 1), item(Uuid::from_u128(0xdead), 1)],
                note: None,
            },
        );
        assert!(matches!(unknown, Err(DomainError::NotFound(_))));
        assert_eq!(f.store.order_count(), 0);
    }

    #[test]
    fn create_order_leaves_nothing_behind_when_item_insert_fails() {
        let f = fixture();
        f.store.fail_item_inserts(true);

        let result = f.service.create_order(
            None,
            CreateOrder {
                table_id: Uuid::nil(),
                venue_id: Uuid::nil(),
                items: vec![item(f.p1, 1)],
                note: None,
            },
        );

        assert!(matches!(result, Err(DomainError::Store(_))));
        assert_eq!(f.store.order_count(), 0);
    }

    #[test]
    fn get_order_fails_for_unknown_id() {
        let f = fixture();
        assert!(matches!(
            f.service.get_order(Uuid::from_u128(42)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn get_order_is_stable_across_reads() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 1), item(f.p2, 3)]);

        let first = f.service.get_order(order.id).unwrap();
        let second = f.service.get_order(order.id).unwrap();
        assert_eq!(first, second);
        let lines: Vec<i32> = first.items.iter().map(|i| i.line_no).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn get_order_returns_every_payment_of_the_order() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);
        let now = f.clock.now();
        f.store
            .transaction(|s| {
                for n in 0..101u128 {
                    s.insert_payment(&Payment {
                        id: Uuid::from_u128(0xF000 + n),
                        order_id: order.id,
                        cashier_id: Uuid::from_u128(0xC1),
                        amount_cents: 1,
                        method: PaymentMethod::Cash,
                        status: PaymentStatus::Completed,
                        reference_number: None,
                        note: None,
                        created_at: now,
                        completed_at: Some(now),
                    })?;
                }
                Ok(())
            })
            .unwrap();

        let loaded = f.service.get_order(order.id).unwrap();
        assert_eq!(loaded.payments.len(), 101);
    }

    #[test]
    fn create_order_rejects_totals_that_overflow() {
        let f = fixture();
        let huge = Uuid::from_u128(0x1003);
        let service = OrderService::new(
            f.store.clone(),
            StaticCatalog::new([(huge, 8_000_000_000_000_000_000)]),
            f.clock.clone(),
            Arc::new(SequentialIds::default()),
        );

        let result = service.create_order(
            None,
            CreateOrder {
                table_id: Uuid::nil(),
                venue_id: Uuid::nil(),
                items: vec![item(huge, 1)],
                note: None,
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(f.store.order_count(), 0);
    }

    #[test]
    fn update_order_replaces_items_and_recomputes_totals() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);

        let updated = f
            .service
            .update_order(
                order.id,
                UpdateOrder {
                    items: Some(vec![item(f.p1, 1)]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.subtotal_cents, 1500);
        assert_eq!(updated.tax_cents, 285);
        assert_eq!(updated.total_cents, 1500 + 285 - updated.discount_cents);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].quantity, 1);
        assert_total_invariant(&updated);
    }

    #[test]
    fn update_order_applies_discount_status_and_note() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);
        f.clock.advance_secs(60);

        let updated = f
            .service
            .update_order(
                order.id,
                UpdateOrder {
                    status: Some(OrderStatus::Preparing),
                    items: Some(vec![]),
                    discount_cents: Some(70),
                    note: Some("no ice".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.subtotal_cents, 3000);
        assert_eq!(updated.discount_cents, 70);
        assert_eq!(updated.total_cents, 3500);
        assert_eq!(updated.note.as_deref(), Some("no ice"));
        assert!(updated.updated_at > updated.created_at);
        assert_eq!(updated.items.len(), 1, "empty item list leaves items alone");
        assert_total_invariant(&updated);
    }

    #[test]
    fn update_order_rejects_discount_above_amount() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);

        let result = f.service.update_order(
            order.id,
            UpdateOrder {
                discount_cents: Some(3571),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let unchanged = f.service.get_order(order.id).unwrap();
        assert_eq!(unchanged.discount_cents, 0);
        assert_eq!(unchanged.total_cents, 3570);
    }

    #[test]
    fn update_order_fails_for_unknown_or_closed_orders() {
        let f = fixture();
        assert!(matches!(
            f.service.update_order(Uuid::from_u128(7), UpdateOrder::default()),
            Err(DomainError::NotFound(_))
        ));

        let order = create(&f, vec![item(f.p1, 1)]);
        assert!(matches!(
            f.service.update_order(
                order.id,
                UpdateOrder {
                    status: Some(OrderStatus::Closed),
                    ..Default::default()
                }
            ),
            Err(DomainError::InvalidState(_))
        ));

        f.service
            .close_order(
                order.id,
                Uuid::from_u128(0xC1),
                CloseOrder {
                    payments: vec![cash(order.total_cents)],
                    note: None,
                },
            )
            .unwrap();
        assert!(matches!(
            f.service.update_order(
                order.id,
                UpdateOrder {
                    note: Some("late".to_string()),
                    ..Default::default()
                }
            ),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn close_order_with_sufficient_payment() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);
        let cashier = Uuid::from_u128(0xC1);

        let closed = f
            .service
            .close_order(
                order.id,
                cashier,
                CloseOrder {
                    payments: vec![cash(3000), cash(570)],
                    note: Some("table paid".to_string()),
                },
            )
            .unwrap();

        assert_eq!(closed.status, OrderStatus::Closed);
        assert_eq!(closed.cashier_id, Some(cashier));
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.note.as_deref(), Some("table paid"));
        assert_eq!(closed.payments.len(), 2);
        assert!(closed
            .payments
            .iter()
            .all(|p| p.status == PaymentStatus::Completed && p.completed_at.is_some()));
    }

    #[test]
    fn close_order_with_insufficient_payment_rolls_back() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);

        let result = f.service.close_order(
            order.id,
            Uuid::from_u128(0xC1),
            CloseOrder {
                payments: vec![cash(2000)],
                note: None,
            },
        );
        assert!(matches!(
            result,
            Err(DomainError::InsufficientPayment {
                expected: 3570,
                paid: 2000
            })
        ));

        let after = f.service.get_order(order.id).unwrap();
        assert_eq!(after.status, OrderStatus::Pending);
        assert_eq!(after.cashier_id, None);
        assert!(after.closed_at.is_none());
        assert!(after.payments.is_empty());
    }

    #[test]
    fn closed_is_terminal() {
        let f = fixture();
        let order = create(&f, vec![item(f.p2, 1)]);
        let close = || CloseOrder {
            payments: vec![cash(10_000)],
            note: None,
        };

        f.service
            .close_order(order.id, Uuid::from_u128(0xC1), close())
            .unwrap();
        let again = f.service.close_order(order.id, Uuid::from_u128(0xC2), close());
        assert!(matches!(again, Err(DomainError::InvalidState(_))));

        let after = f.service.get_order(order.id).unwrap();
        assert_eq!(after.cashier_id, Some(Uuid::from_u128(0xC1)));
        assert_eq!(after.payments.len(), 1);
    }

    #[test]
    fn close_order_validates_payments() {
        let f = fixture();
        let order = create(&f, vec![item(f.p2, 1)]);
        let cashier = Uuid::from_u128(0xC1);

        let none = f.service.close_order(
            order.id,
            cashier,
            CloseOrder {
                payments: vec![],
                note: None,
            },
        );
        assert!(matches!(none, Err(DomainError::Validation(_))));

        let zero = f.service.close_order(
            order.id,
            cashier,
            CloseOrder {
                payments: vec![cash(0)],
                note: None,
            },
        );
        assert!(matches!(zero, Err(DomainError::Validation(_))));
    }

    #[test]
    fn concurrent_closes_settle_once() {
        let f = fixture();
        let order = create(&f, vec![item(f.p1, 2)]);
        let service = Arc::new(f.service);

        let handles: Vec<_> = (0..8u128)
            .map(|n| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    service.close_order(
                        order.id,
                        Uuid::from_u128(0xC00 + n),
                        CloseOrder {
                            payments: vec![cash(3570)],
                            note: None,
                        },
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DomainError::InvalidState(_))));
        assert_eq!(f.store.payment_count(), 1);
    }

    #[test]
    fn list_orders_loads_items_but_not_payments() {
        let f = fixture();
        let first = create(&f, vec![item(f.p1, 1)]);
        f.clock.advance_secs(5);
        let second = create(&f, vec![item(f.p2, 2)]);
        f.service
            .close_order(
                first.id,
                Uuid::from_u128(0xC1),
                CloseOrder {
                    payments: vec![cash(first.total_cents)],
                    note: None,
                },
            )
            .unwrap();

        let orders = f.service.list_orders(&OrderFilter::default()).unwrap();
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(orders.iter().all(|o| o.items.len() == 1));
        assert!(orders.iter().all(|o| o.payments.is_empty()));

        let closable = f
            .service
            .list_closable_orders(OrderFilter::default())
            .unwrap();
        assert_eq!(closable.len(), 1);
        assert_eq!(closable[0].id, second.id);
    }
}
