//! Integration tests for `WarehouseService` over both persistence adapters.
//!
//! Every scenario is written once, generic over `UnitOfWorkFactory`, and run
//! against the in-memory store and an in-memory SQLite database.

use proptest::prelude::*;

use stockroom_infra::{InMemoryStore, SqliteStore};
use stockroom_inventory::{
    atomically, DomainError, DomainResult, MovementType, OrderRepository, Product, ProductId,
    ProductRepository, StockItemRepository, StockMovement, StockMovementRepository, UnitOfWork,
    UnitOfWorkFactory, Warehouse, WarehouseId, WarehouseRepository, WarehouseService,
};

fn sqlite_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:").unwrap();
    store.migrate().unwrap();
    store
}

/// Run `operation` in a fresh unit of work, committing on success.
fn run<S, T>(
    store: &S,
    operation: impl FnOnce(&WarehouseService<'_, S::UnitOfWork>) -> DomainResult<T>,
) -> DomainResult<T>
where
    S: UnitOfWorkFactory,
{
    atomically(store.begin()?, operation)
}

/// A product with `units` in warehouse A and nothing in warehouse B.
fn stocked<S: UnitOfWorkFactory>(store: &S, units: u32) -> (Product, Warehouse, Warehouse) {
    run(store, |service| {
        let product = service.create_product("Widget", units, 10)?;
        let a = service.create_warehouse("A", "Moscow", 1_000)?;
        let b = service.create_warehouse("B", "Kazan", 1_000)?;
        service.add_stock_to_warehouse(&product, &a, units)?;
        Ok((product, a, b))
    })
    .unwrap()
}

/// (quantity, reserved) at a warehouse, `None` if never stocked.
fn level<S: UnitOfWorkFactory>(
    store: &S,
    product: &Product,
    warehouse: &Warehouse,
) -> Option<(u32, u32)> {
    match run(store, |service| service.stock_level(product, warehouse)) {
        Ok(stock) => Some((stock.quantity(), stock.reserved_quantity())),
        Err(err) if err.is_not_found() => None,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

fn movements<S: UnitOfWorkFactory>(store: &S) -> Vec<StockMovement> {
    let uow = store.begin().unwrap();
    uow.stock_movements().list().unwrap()
}

fn reserve_transfer_release_round_trip<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = run(store, |service| {
        let product = service.create_product("Widget", 0, 10)?;
        let a = service.create_warehouse("A", "Moscow", 1_000)?;
        let b = service.create_warehouse("B", "Kazan", 1_000)?;
        Ok((product, a, b))
    })
    .unwrap();

    run(store, |service| {
        service.add_stock_to_warehouse(&product, &a, 50)?;
        service.reserve_stock(&product, &a, 20)?;
        service.transfer_stock(&product, &a, &b, 10)?;
        service.release_reserved_stock(&product, &a, 5)
    })
    .unwrap();

    assert_eq!(level(store, &product, &a), Some((40, 15)));
    assert_eq!(level(store, &product, &b), Some((10, 0)));

    let recorded = movements(store);
    assert_eq!(recorded.len(), 1);
    let movement = &recorded[0];
    assert_eq!(movement.product_id(), product.id());
    assert_eq!(movement.source_warehouse_id(), a.id());
    assert_eq!(movement.destination_warehouse_id(), b.id());
    assert_eq!(movement.quantity(), 10);
    assert_eq!(movement.movement_type(), MovementType::Transfer);
}

fn reserve_beyond_available_fails<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, _) = stocked(store, 10);
    run(store, |service| service.reserve_stock(&product, &a, 8)).unwrap();

    let err = run(store, |service| service.reserve_stock(&product, &a, 5)).unwrap_err();
    assert_eq!(
        err,
        DomainError::InsufficientStock {
            requested: 5,
            available: 2
        }
    );
    assert_eq!(level(store, &product, &a), Some((10, 8)));
}

fn reserved_units_cannot_be_transferred<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);
    run(store, |service| service.reserve_stock(&product, &a, 10)).unwrap();

    let err = run(store, |service| service.transfer_stock(&product, &a, &b, 1)).unwrap_err();
    assert_eq!(
        err,
        DomainError::InsufficientStock {
            requested: 1,
            available: 0
        }
    );
    assert_eq!(level(store, &product, &a), Some((10, 10)));
    assert_eq!(level(store, &product, &b), None);
    assert!(movements(store).is_empty());
}

fn release_more_than_reserved_fails<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, _) = stocked(store, 10);
    run(store, |service| service.reserve_stock(&product, &a, 3)).unwrap();

    let err = run(store, |service| service.release_reserved_stock(&product, &a, 4)).unwrap_err();
    assert_eq!(
        err,
        DomainError::OverRelease {
            requested: 4,
            reserved: 3
        }
    );
    assert_eq!(level(store, &product, &a), Some((10, 3)));
}

fn operations_on_unstocked_pair_are_not_found<S: UnitOfWorkFactory>(store: &S) {
    let (product, _, b) = stocked(store, 10);

    for err in [
        run(store, |service| service.reserve_stock(&product, &b, 1)).unwrap_err(),
        run(store, |service| service.release_reserved_stock(&product, &b, 1)).unwrap_err(),
        run(store, |service| service.stock_level(&product, &b)).unwrap_err(),
    ] {
        assert!(err.is_not_found(), "{err}");
    }
}

fn transfer_creates_destination_stock<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);
    run(store, |service| service.reserve_stock(&product, &a, 2)).unwrap();

    run(store, |service| service.transfer_stock(&product, &a, &b, 7)).unwrap();

    assert_eq!(level(store, &product, &a), Some((3, 2)));
    assert_eq!(level(store, &product, &b), Some((7, 0)));
}

fn transfer_into_existing_stock_keeps_its_reservation<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);
    run(store, |service| {
        service.add_stock_to_warehouse(&product, &b, 4)?;
        service.reserve_stock(&product, &b, 1)
    })
    .unwrap();

    run(store, |service| service.transfer_stock(&product, &a, &b, 6)).unwrap();

    assert_eq!(level(store, &product, &a), Some((4, 0)));
    assert_eq!(level(store, &product, &b), Some((10, 1)));
}

fn transfers_conserve_total_quantity<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 25);
    let c = run(store, |service| service.create_warehouse("C", "Omsk", 100)).unwrap();

    run(store, |service| {
        service.transfer_stock(&product, &a, &b, 10)?;
        service.transfer_stock(&product, &b, &c, 4)?;
        service.transfer_stock(&product, &a, &c, 5)
    })
    .unwrap();

    let total = run(store, |service| service.total_quantity(&product)).unwrap();
    assert_eq!(total, 25);
    assert_eq!(movements(store).len(), 3);
}

fn failed_transfer_leaves_no_trace<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);
    run(store, |service| service.add_stock_to_warehouse(&product, &b, u32::MAX)).unwrap();

    // The source is already debited when the destination overflows.
    let err = run(store, |service| service.transfer_stock(&product, &a, &b, 5)).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err}");

    assert_eq!(level(store, &product, &a), Some((10, 0)));
    assert_eq!(level(store, &product, &b), Some((u32::MAX, 0)));
    assert!(movements(store).is_empty());
}

fn failure_discards_earlier_steps_of_the_same_unit_of_work<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);

    let err = run(store, |service| {
        service.add_stock_to_warehouse(&product, &a, 5)?;
        service.transfer_stock(&product, &a, &b, 100)
    })
    .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock { .. }));

    assert_eq!(level(store, &product, &a), Some((10, 0)));
}

fn zero_quantities_are_rejected<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);

    for err in [
        run(store, |service| service.add_stock_to_warehouse(&product, &a, 0)).unwrap_err(),
        run(store, |service| service.reserve_stock(&product, &a, 0)).unwrap_err(),
        run(store, |service| service.release_reserved_stock(&product, &a, 0)).unwrap_err(),
        run(store, |service| service.transfer_stock(&product, &a, &b, 0)).unwrap_err(),
    ] {
        assert!(matches!(err, DomainError::Validation(_)), "{err}");
    }
    assert!(movements(store).is_empty());
}

fn transfer_to_same_warehouse_is_rejected<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, _) = stocked(store, 10);

    let err = run(store, |service| service.transfer_stock(&product, &a, &a, 1)).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err}");
    assert_eq!(level(store, &product, &a), Some((10, 0)));
}

fn transfer_to_unknown_warehouse_is_not_found<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, _) = stocked(store, 10);
    let ghost = Warehouse::restore(WarehouseId::new(999), "Ghost", "Nowhere", 0);

    let err = run(store, |service| service.transfer_stock(&product, &a, &ghost, 1)).unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert_eq!(level(store, &product, &a), Some((10, 0)));
}

fn repeated_receipts_accumulate_on_one_stock_item<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, _) = stocked(store, 10);

    let first = run(store, |service| service.stock_level(&product, &a)).unwrap();
    let second = run(store, |service| service.add_stock_to_warehouse(&product, &a, 15)).unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(second.quantity(), 25);
    let uow = store.begin().unwrap();
    assert_eq!(uow.stock_items().list().unwrap().len(), 1);
}

fn movement_listings_match_either_end<S: UnitOfWorkFactory>(store: &S) {
    let (product, a, b) = stocked(store, 10);
    let (other, c) = run(store, |service| {
        let other = service.create_product("Gadget", 5, 3)?;
        let c = service.create_warehouse("C", "Omsk", 100)?;
        service.add_stock_to_warehouse(&other, &b, 5)?;
        Ok((other, c))
    })
    .unwrap();

    run(store, |service| {
        service.transfer_stock(&product, &a, &b, 3)?;
        service.transfer_stock(&other, &b, &c, 2)
    })
    .unwrap();

    let (via_a, via_b, via_c, of_other) = run(store, |service| {
        Ok((
            service.movements_for_warehouse(&a)?,
            service.movements_for_warehouse(&b)?,
            service.movements_for_warehouse(&c)?,
            service.movements_for_product(&other)?,
        ))
    })
    .unwrap();

    assert_eq!(via_a.len(), 1);
    assert_eq!(via_b.len(), 2);
    assert_eq!(via_c.len(), 1);
    assert!(via_b.iter().all(|m| m.involves(b.id())));
    assert_eq!(of_other.len(), 1);
    assert_eq!(of_other[0].source_warehouse_id(), b.id());
    assert_eq!(of_other[0].destination_warehouse_id(), c.id());
}

fn orders_collect_product_references<S: UnitOfWorkFactory>(store: &S) {
    let (widget, gadget, order) = run(store, |service| {
        let widget = service.create_product("Widget", 1, 10)?;
        let gadget = service.create_product("Gadget", 1, 20)?;
        let order = service.create_order(&[widget.clone()])?;
        Ok((widget, gadget, order))
    })
    .unwrap();
    assert_eq!(order.products(), &[widget.id()]);

    let updated = run(store, |service| service.add_product_to_order(order.id(), gadget.id())).unwrap();
    assert_eq!(updated.products(), &[widget.id(), gadget.id()]);

    let uow = store.begin().unwrap();
    assert_eq!(uow.orders().get(order.id()).unwrap(), updated);

    let err = run(store, |service| {
        service.add_product_to_order(order.id(), ProductId::new(404))
    })
    .unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

fn blank_names_are_rejected<S: UnitOfWorkFactory>(store: &S) {
    let err = run(store, |service| service.create_product("  ", 1, 1)).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err}");
    let err = run(store, |service| service.create_warehouse("", "Moscow", 1)).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err}");

    let uow = store.begin().unwrap();
    assert!(uow.products().list().unwrap().is_empty());
    assert!(uow.warehouses().list().unwrap().is_empty());
}

macro_rules! on_every_store {
    ($($scenario:ident),* $(,)?) => {
        mod in_memory {
            $(
                #[test]
                fn $scenario() {
                    super::$scenario(&super::InMemoryStore::new());
                }
            )*
        }

        mod sqlite {
            $(
                #[test]
                fn $scenario() {
                    super::$scenario(&super::sqlite_store());
                }
            )*
        }
    };
}

on_every_store!(
    reserve_transfer_release_round_trip,
    reserve_beyond_available_fails,
    reserved_units_cannot_be_transferred,
    release_more_than_reserved_fails,
    operations_on_unstocked_pair_are_not_found,
    transfer_creates_destination_stock,
    transfer_into_existing_stock_keeps_its_reservation,
    transfers_conserve_total_quantity,
    failed_transfer_leaves_no_trace,
    failure_discards_earlier_steps_of_the_same_unit_of_work,
    zero_quantities_are_rejected,
    transfer_to_same_warehouse_is_rejected,
    transfer_to_unknown_warehouse_is_not_found,
    repeated_receipts_accumulate_on_one_stock_item,
    movement_listings_match_either_end,
    orders_collect_product_references,
    blank_names_are_rejected,
);

#[test]
fn concurrent_commit_on_same_stock_is_a_conflict() {
    let store = InMemoryStore::new();
    let (product, a, _) = stocked(&store, 10);

    let first = store.begin().unwrap();
    let second = store.begin().unwrap();
    WarehouseService::new(&first)
        .reserve_stock(&product, &a, 6)
        .unwrap();
    WarehouseService::new(&second)
        .reserve_stock(&product, &a, 6)
        .unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "{err}");
    assert_eq!(level(&store, &product, &a), Some((10, 6)));
}

#[derive(Debug, Clone)]
enum Op {
    Add(u32),
    Reserve(u32),
    Release(u32),
    TransferOut(u32),
    TransferBack(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..50).prop_map(Op::Add),
        (1u32..50).prop_map(Op::Reserve),
        (1u32..50).prop_map(Op::Release),
        (1u32..50).prop_map(Op::TransferOut),
        (1u32..50).prop_map(Op::TransferBack),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// Transfers only move stock; receipts are the only source of new units,
    /// and failed operations change nothing.
    #[test]
    fn stock_is_conserved_under_random_operations(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let store = InMemoryStore::new();
        let (product, a, b) = stocked(&store, 20);
        let mut received: u64 = 20;
        let mut transfers = 0usize;

        for op in &ops {
            let before = (level(&store, &product, &a), level(&store, &product, &b));
            let outcome = match op {
                Op::Add(q) => run(&store, |s| s.add_stock_to_warehouse(&product, &a, *q).map(|_| ())),
                Op::Reserve(q) => run(&store, |s| s.reserve_stock(&product, &a, *q).map(|_| ())),
                Op::Release(q) => run(&store, |s| s.release_reserved_stock(&product, &a, *q).map(|_| ())),
                Op::TransferOut(q) => run(&store, |s| s.transfer_stock(&product, &a, &b, *q).map(|_| ())),
                Op::TransferBack(q) => run(&store, |s| s.transfer_stock(&product, &b, &a, *q).map(|_| ())),
            };

            match (op, &outcome) {
                (Op::Add(q), Ok(())) => received += u64::from(*q),
                (Op::TransferOut(_) | Op::TransferBack(_), Ok(())) => transfers += 1,
                (_, Err(_)) => {
                    let after = (level(&store, &product, &a), level(&store, &product, &b));
                    prop_assert_eq!(before, after);
                }
                _ => {}
            }

            for (quantity, reserved) in [level(&store, &product, &a), level(&store, &product, &b)]
                .into_iter()
                .flatten()
            {
                prop_assert!(reserved <= quantity);
            }
        }

        let total = run(&store, |s| s.total_quantity(&product)).unwrap();
        prop_assert_eq!(total, received);
        prop_assert_eq!(movements(&store).len(), transfers);
    }
}
