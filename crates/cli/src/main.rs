//! `stockroom`: run the reserve/transfer/release walkthrough against the
//! configured store and print every resulting entity as JSON.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use stockroom_infra::{InMemoryStore, SqliteStore, StoreBackend, StoreConfig};
use stockroom_inventory::{atomically, UnitOfWorkFactory};

fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    match config.backend {
        StoreBackend::Memory => walkthrough(&InMemoryStore::new()),
        StoreBackend::Sqlite { url } => {
            let store = SqliteStore::connect(&url)
                .with_context(|| format!("failed to open {url}"))?;
            store.migrate().context("failed to create schema")?;
            walkthrough(&store)
        }
    }
}

fn walkthrough<S: UnitOfWorkFactory>(store: &S) -> anyhow::Result<()> {
    let (product, a, b) = atomically(store.begin()?, |service| {
        let product = service.create_product("Widget", 100, 10)?;
        let a = service.create_warehouse("Warehouse A", "Moscow", 1_000)?;
        let b = service.create_warehouse("Warehouse B", "Saint Petersburg", 1_000)?;
        Ok((product, a, b))
    })
    .context("failed to create catalog")?;
    print("product", &product)?;
    print("warehouse", &a)?;
    print("warehouse", &b)?;

    let stock = atomically(store.begin()?, |service| {
        service.add_stock_to_warehouse(&product, &a, 50)?;
        service.reserve_stock(&product, &a, 20)
    })
    .context("failed to receive and reserve stock")?;
    print("stock", &stock)?;

    let movement = atomically(store.begin()?, |service| {
        service.transfer_stock(&product, &a, &b, 10)
    })
    .context("transfer failed")?;
    print("movement", &movement)?;

    let (source, destination) = atomically(store.begin()?, |service| {
        let source = service.release_reserved_stock(&product, &a, 5)?;
        Ok((source, service.stock_level(&product, &b)?))
    })
    .context("release failed")?;
    print("stock", &source)?;
    print("stock", &destination)?;

    let order = atomically(store.begin()?, |service| {
        service.create_order(std::slice::from_ref(&product))
    })
    .context("failed to create order")?;
    print("order", &order)?;

    info!(
        order_id = %order.id(),
        movement_id = %movement.id(),
        "walkthrough finished"
    );
    Ok(())
}

fn print<T: Serialize>(kind: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{kind}: {json}");
    Ok(())
}
