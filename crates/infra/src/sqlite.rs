//! SQLite-backed persistence adapter.
//!
//! The repository contracts are synchronous; `sqlx` is async. Each store owns
//! a single-threaded tokio runtime and every statement is driven with
//! `block_on`, so a unit of work stays one sequential transaction.
//!
//! ## Error Mapping
//!
//! | SQLx error | DomainError | Scenario |
//! |------------|-------------|----------|
//! | Database (unique violation) on a write | `NotPersistable` | second stock item for the same (product, warehouse) |
//! | Database (foreign key violation) on a write | `NotPersistable` | reference to a missing product / warehouse / order |
//! | Database (check violation) on a write | `NotPersistable` | `reserved_quantity > quantity`, zero-quantity movement |
//! | any other error on a write or commit | `NotPersistable` | connection failure, busy database |
//! | any error on a read / begin / rollback | `Storage` | connection failure, undecodable row |
//!
//! Isolation relies on SQLite's single-writer lock: transactions are
//! serializable.

use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Transaction, Type};
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument, warn};

use stockroom_core::{
    DomainError, DomainResult, Entity, OrderId, ProductId, StockItemId, StockMovementId,
    WarehouseId,
};
use stockroom_inventory::{
    MovementType, NewOrder, NewProduct, NewStockItem, NewStockMovement, NewWarehouse, Order,
    OrderRepository, Product, ProductRepository, StockItem, StockItemRepository, StockMovement,
    StockMovementRepository, UnitOfWork, UnitOfWorkFactory, Warehouse, WarehouseRepository,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        name      TEXT    NOT NULL,
        quantity  INTEGER NOT NULL CHECK (quantity >= 0),
        price     INTEGER NOT NULL CHECK (price >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS warehouses (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        name      TEXT    NOT NULL,
        location  TEXT    NOT NULL,
        capacity  INTEGER NOT NULL CHECK (capacity >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id        INTEGER PRIMARY KEY AUTOINCREMENT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_products (
        order_id    INTEGER NOT NULL REFERENCES orders (id),
        position    INTEGER NOT NULL,
        product_id  INTEGER NOT NULL REFERENCES products (id),
        PRIMARY KEY (order_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_items (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id         INTEGER NOT NULL REFERENCES products (id),
        warehouse_id       INTEGER NOT NULL REFERENCES warehouses (id),
        quantity           INTEGER NOT NULL CHECK (quantity >= 0),
        reserved_quantity  INTEGER NOT NULL DEFAULT 0
            CHECK (reserved_quantity >= 0 AND reserved_quantity <= quantity),
        UNIQUE (product_id, warehouse_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id                        INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id                INTEGER NOT NULL REFERENCES products (id),
        source_warehouse_id       INTEGER NOT NULL REFERENCES warehouses (id),
        destination_warehouse_id  INTEGER NOT NULL REFERENCES warehouses (id),
        quantity                  INTEGER NOT NULL CHECK (quantity > 0),
        movement_type             TEXT    NOT NULL
            CHECK (movement_type IN ('receipt', 'shipment', 'transfer')),
        timestamp                 TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stock_movements_product ON stock_movements (product_id)",
];

/// How long `begin` waits for a free connection on an in-memory database.
const MEMORY_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// SQLite store: a connection pool plus the runtime that drives it.
///
/// Blocking by construction; do not call it from inside another async runtime.
#[derive(Debug)]
pub struct SqliteStore {
    shared: Arc<Shared>,
}

/// Runtime and pool, shared by the store and every open unit of work.
///
/// Dropped with the last holder, so the pool is only closed once every
/// transaction has been handed back.
#[derive(Debug)]
struct Shared {
    runtime: Runtime,
    pool: SqlitePool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite://stock.db` or `sqlite::memory:`.
    ///
    /// An in-memory database lives only as long as its connection, so it gets
    /// a pool of exactly one connection that is never retired. Only one unit
    /// of work can be open on it at a time: a second `begin` fails with
    /// `Storage` after a short wait.
    #[instrument(err)]
    pub fn connect(url: &str) -> DomainResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DomainError::storage(format!("failed to start runtime: {e}")))?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DomainError::storage(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(if in_memory { 1 } else { 4 })
                    .acquire_timeout(if in_memory {
                        MEMORY_ACQUIRE_TIMEOUT
                    } else {
                        Duration::from_secs(30)
                    })
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options),
            )
            .map_err(|e| read_error("connect", e))?;

        info!(in_memory, "sqlite store connected");
        Ok(Self {
            shared: Arc::new(Shared { runtime, pool }),
        })
    }

    /// Create the schema if it does not exist yet. Idempotent.
    #[instrument(skip(self), err)]
    pub fn migrate(&self) -> DomainResult<()> {
        let Shared { runtime, pool } = &*self.shared;
        runtime.block_on(async {
            for statement in SCHEMA {
                sqlx::query(*statement)
                    .execute(pool)
                    .await
                    .map_err(|e| read_error("migrate", e))?;
            }
            Ok::<_, DomainError>(())
        })?;
        debug!(statements = SCHEMA.len(), "schema ready");
        Ok(())
    }
}

impl UnitOfWorkFactory for SqliteStore {
    type UnitOfWork = SqliteUnitOfWork;

    fn begin(&self) -> DomainResult<SqliteUnitOfWork> {
        let tx = self
            .shared
            .runtime
            .block_on(self.shared.pool.begin())
            .map_err(|e| read_error("begin transaction", e))?;

        let session = Rc::new(Session {
            shared: Arc::clone(&self.shared),
            tx: RefCell::new(Some(tx)),
        });
        debug!("sqlite unit of work started");

        Ok(SqliteUnitOfWork {
            products: SqliteProducts(Rc::clone(&session)),
            orders: SqliteOrders(Rc::clone(&session)),
            warehouses: SqliteWarehouses(Rc::clone(&session)),
            stock_items: SqliteStockItems(Rc::clone(&session)),
            stock_movements: SqliteStockMovements(Rc::clone(&session)),
            session,
        })
    }
}

/// The open transaction shared by the repositories of one unit of work.
struct Session {
    shared: Arc<Shared>,
    tx: RefCell<Option<Transaction<'static, Sqlite>>>,
}

impl Session {
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.shared.runtime.block_on(future)
    }

    fn transaction(&self) -> DomainResult<RefMut<'_, Transaction<'static, Sqlite>>> {
        let slot = self
            .tx
            .try_borrow_mut()
            .map_err(|_| DomainError::storage("transaction already in use"))?;
        RefMut::filter_map(slot, Option::as_mut)
            .map_err(|_| DomainError::storage("unit of work already finished"))
    }

    fn take(&self) -> Option<Transaction<'static, Sqlite>> {
        self.tx.borrow_mut().take()
    }
}

/// One SQLite transaction.
pub struct SqliteUnitOfWork {
    session: Rc<Session>,
    products: SqliteProducts,
    orders: SqliteOrders,
    warehouses: SqliteWarehouses,
    stock_items: SqliteStockItems,
    stock_movements: SqliteStockMovements,
}

impl UnitOfWork for SqliteUnitOfWork {
    type Products = SqliteProducts;
    type Orders = SqliteOrders;
    type Warehouses = SqliteWarehouses;
    type StockItems = SqliteStockItems;
    type StockMovements = SqliteStockMovements;

    fn products(&self) -> &SqliteProducts {
        &self.products
    }

    fn orders(&self) -> &SqliteOrders {
        &self.orders
    }

    fn warehouses(&self) -> &SqliteWarehouses {
        &self.warehouses
    }

    fn stock_items(&self) -> &SqliteStockItems {
        &self.stock_items
    }

    fn stock_movements(&self) -> &SqliteStockMovements {
        &self.stock_movements
    }

    fn commit(self) -> DomainResult<()> {
        let tx = self
            .session
            .take()
            .ok_or_else(|| DomainError::storage("unit of work already finished"))?;
        self.session
            .block_on(tx.commit())
            .map_err(|e| write_error("commit", e))?;
        debug!("sqlite unit of work committed");
        Ok(())
    }

    fn rollback(self) -> DomainResult<()> {
        let tx = self
            .session
            .take()
            .ok_or_else(|| DomainError::storage("unit of work already finished"))?;
        self.session
            .block_on(tx.rollback())
            .map_err(|e| read_error("rollback", e))?;
        debug!("sqlite unit of work rolled back");
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork {
    // Roll back inside the runtime: the pooled connection must be handed back
    // from a tokio context.
    fn drop(&mut self) {
        if let Some(tx) = self.session.take() {
            debug!("unit of work dropped without commit; rolling back");
            if let Err(e) = self.session.block_on(tx.rollback()) {
                warn!(error = %e, "rollback on drop failed");
            }
        }
    }
}

pub struct SqliteProducts(Rc<Session>);
pub struct SqliteOrders(Rc<Session>);
pub struct SqliteWarehouses(Rc<Session>);
pub struct SqliteStockItems(Rc<Session>);
pub struct SqliteStockMovements(Rc<Session>);

impl ProductRepository for SqliteProducts {
    fn add(&self, product: NewProduct) -> DomainResult<Product> {
        let price = to_db_amount(product.price)?;
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(
                sqlx::query("INSERT INTO products (name, quantity, price) VALUES (?, ?, ?)")
                    .bind(product.name.as_str())
                    .bind(i64::from(product.quantity))
                    .bind(price)
                    .execute(&mut **tx),
            )
            .map_err(|e| write_error("insert product", e))?;
        Ok(product.into_product(ProductId::new(result.last_insert_rowid())))
    }

    fn get(&self, id: ProductId) -> DomainResult<Product> {
        let mut tx = self.0.transaction()?;
        let row = self
            .0
            .block_on(
                sqlx::query("SELECT id, name, quantity, price FROM products WHERE id = ?")
                    .bind(id.get())
                    .fetch_optional(&mut **tx),
            )
            .map_err(|e| read_error("load product", e))?;
        match row {
            Some(row) => product_from_row(&row),
            None => Err(DomainError::not_found(Product::KIND, id)),
        }
    }

    fn list(&self) -> DomainResult<Vec<Product>> {
        let mut tx = self.0.transaction()?;
        let rows = self
            .0
            .block_on(
                sqlx::query("SELECT id, name, quantity, price FROM products ORDER BY id")
                    .fetch_all(&mut **tx),
            )
            .map_err(|e| read_error("list products", e))?;
        rows.iter().map(product_from_row).collect()
    }
}

impl OrderRepository for SqliteOrders {
    fn add(&self, order: NewOrder) -> DomainResult<Order> {
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(sqlx::query("INSERT INTO orders DEFAULT VALUES").execute(&mut **tx))
            .map_err(|e| write_error("insert order", e))?;
        let order = order.into_order(OrderId::new(result.last_insert_rowid()));
        write_order_products(&self.0, &mut tx, &order)?;
        Ok(order)
    }

    fn get(&self, id: OrderId) -> DomainResult<Order> {
        let mut tx = self.0.transaction()?;
        let exists = self
            .0
            .block_on(
                sqlx::query("SELECT id FROM orders WHERE id = ?")
                    .bind(id.get())
                    .fetch_optional(&mut **tx),
            )
            .map_err(|e| read_error("load order", e))?;
        if exists.is_none() {
            return Err(DomainError::not_found(Order::KIND, id));
        }

        let rows = self
            .0
            .block_on(
                sqlx::query(
                    "SELECT product_id FROM order_products WHERE order_id = ? ORDER BY position",
                )
                .bind(id.get())
                .fetch_all(&mut **tx),
            )
            .map_err(|e| read_error("load order products", e))?;
        let products = rows
            .iter()
            .map(|row| column::<i64>(row, "product_id").map(ProductId::new))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Order::restore(id, products))
    }

    fn list(&self) -> DomainResult<Vec<Order>> {
        let mut tx = self.0.transaction()?;
        let order_rows = self
            .0
            .block_on(sqlx::query("SELECT id FROM orders ORDER BY id").fetch_all(&mut **tx))
            .map_err(|e| read_error("list orders", e))?;
        let line_rows = self
            .0
            .block_on(
                sqlx::query(
                    "SELECT order_id, product_id FROM order_products ORDER BY order_id, position",
                )
                .fetch_all(&mut **tx),
            )
            .map_err(|e| read_error("list order products", e))?;

        let mut lines: BTreeMap<i64, Vec<ProductId>> = BTreeMap::new();
        for row in &line_rows {
            let order_id = column::<i64>(row, "order_id")?;
            let product_id = column::<i64>(row, "product_id")?;
            lines.entry(order_id).or_default().push(ProductId::new(product_id));
        }

        order_rows
            .iter()
            .map(|row| {
                let id = column::<i64>(row, "id")?;
                let products = lines.remove(&id).unwrap_or_default();
                Ok(Order::restore(OrderId::new(id), products))
            })
            .collect()
    }

    fn update(&self, order: &Order) -> DomainResult<()> {
        let mut tx = self.0.transaction()?;
        let exists = self
            .0
            .block_on(
                sqlx::query("SELECT id FROM orders WHERE id = ?")
                    .bind(order.id().get())
                    .fetch_optional(&mut **tx),
            )
            .map_err(|e| read_error("load order", e))?;
        if exists.is_none() {
            return Err(DomainError::not_found(Order::KIND, order.id()));
        }

        self.0
            .block_on(
                sqlx::query("DELETE FROM order_products WHERE order_id = ?")
                    .bind(order.id().get())
                    .execute(&mut **tx),
            )
            .map_err(|e| write_error("rewrite order products", e))?;
        write_order_products(&self.0, &mut tx, order)
    }
}

fn write_order_products(
    session: &Session,
    tx: &mut Transaction<'static, Sqlite>,
    order: &Order,
) -> DomainResult<()> {
    for (position, product_id) in order.products().iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| DomainError::not_persistable("order has too many products"))?;
        session
            .block_on(
                sqlx::query(
                    "INSERT INTO order_products (order_id, position, product_id) VALUES (?, ?, ?)",
                )
                .bind(order.id().get())
                .bind(position)
                .bind(product_id.get())
                .execute(&mut **tx),
            )
            .map_err(|e| write_error("insert order product", e))?;
    }
    Ok(())
}

impl WarehouseRepository for SqliteWarehouses {
    fn add(&self, warehouse: NewWarehouse) -> DomainResult<Warehouse> {
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(
                sqlx::query("INSERT INTO warehouses (name, location, capacity) VALUES (?, ?, ?)")
                    .bind(warehouse.name.as_str())
                    .bind(warehouse.location.as_str())
                    .bind(i64::from(warehouse.capacity))
                    .execute(&mut **tx),
            )
            .map_err(|e| write_error("insert warehouse", e))?;
        Ok(warehouse.into_warehouse(WarehouseId::new(result.last_insert_rowid())))
    }

    fn get(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        let mut tx = self.0.transaction()?;
        let row = self
            .0
            .block_on(
                sqlx::query("SELECT id, name, location, capacity FROM warehouses WHERE id = ?")
                    .bind(id.get())
                    .fetch_optional(&mut **tx),
            )
            .map_err(|e| read_error("load warehouse", e))?;
        match row {
            Some(row) => warehouse_from_row(&row),
            None => Err(DomainError::not_found(Warehouse::KIND, id)),
        }
    }

    fn list(&self) -> DomainResult<Vec<Warehouse>> {
        let mut tx = self.0.transaction()?;
        let rows = self
            .0
            .block_on(
                sqlx::query("SELECT id, name, location, capacity FROM warehouses ORDER BY id")
                    .fetch_all(&mut **tx),
            )
            .map_err(|e| read_error("list warehouses", e))?;
        rows.iter().map(warehouse_from_row).collect()
    }
}

const STOCK_ITEM_COLUMNS: &str = "id, product_id, warehouse_id, quantity, reserved_quantity";

impl StockItemRepository for SqliteStockItems {
    fn add(&self, stock_item: NewStockItem) -> DomainResult<StockItem> {
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(
                sqlx::query(
                    "INSERT INTO stock_items (product_id, warehouse_id, quantity, reserved_quantity) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(stock_item.product_id.get())
                .bind(stock_item.warehouse_id.get())
                .bind(i64::from(stock_item.quantity))
                .bind(i64::from(stock_item.reserved_quantity))
                .execute(&mut **tx),
            )
            .map_err(|e| write_error("insert stock item", e))?;
        stock_item.into_stock_item(StockItemId::new(result.last_insert_rowid()))
    }

    fn get(&self, id: StockItemId) -> DomainResult<StockItem> {
        let mut tx = self.0.transaction()?;
        let sql = format!("SELECT {STOCK_ITEM_COLUMNS} FROM stock_items WHERE id = ?");
        let row = self
            .0
            .block_on(sqlx::query(&sql).bind(id.get()).fetch_optional(&mut **tx))
            .map_err(|e| read_error("load stock item", e))?;
        match row {
            Some(row) => stock_item_from_row(&row),
            None => Err(DomainError::not_found(StockItem::KIND, id)),
        }
    }

    fn list(&self) -> DomainResult<Vec<StockItem>> {
        let mut tx = self.0.transaction()?;
        let sql = format!("SELECT {STOCK_ITEM_COLUMNS} FROM stock_items ORDER BY id");
        let rows = self
            .0
            .block_on(sqlx::query(&sql).fetch_all(&mut **tx))
            .map_err(|e| read_error("list stock items", e))?;
        rows.iter().map(stock_item_from_row).collect()
    }

    fn update(&self, stock_item: &StockItem) -> DomainResult<()> {
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(
                sqlx::query(
                    "UPDATE stock_items SET quantity = ?, reserved_quantity = ? WHERE id = ?",
                )
                .bind(i64::from(stock_item.quantity()))
                .bind(i64::from(stock_item.reserved_quantity()))
                .bind(stock_item.id().get())
                .execute(&mut **tx),
            )
            .map_err(|e| write_error("update stock item", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(StockItem::KIND, stock_item.id()));
        }
        Ok(())
    }

    fn find_by_product_and_warehouse(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Option<StockItem>> {
        let mut tx = self.0.transaction()?;
        let sql = format!(
            "SELECT {STOCK_ITEM_COLUMNS} FROM stock_items WHERE product_id = ? AND warehouse_id = ?"
        );
        let row = self
            .0
            .block_on(
                sqlx::query(&sql)
                    .bind(product_id.get())
                    .bind(warehouse_id.get())
                    .fetch_optional(&mut **tx),
            )
            .map_err(|e| read_error("find stock item", e))?;
        row.as_ref().map(stock_item_from_row).transpose()
    }
}

const MOVEMENT_COLUMNS: &str = "id, product_id, source_warehouse_id, destination_warehouse_id, \
                                quantity, movement_type, timestamp";

impl SqliteStockMovements {
    fn fetch(&self, filter: &str, binds: &[i64]) -> DomainResult<Vec<StockMovement>> {
        let mut tx = self.0.transaction()?;
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements {filter} ORDER BY id");
        let query = binds
            .iter()
            .fold(sqlx::query(&sql), |query, value| query.bind(*value));
        let rows = self
            .0
            .block_on(query.fetch_all(&mut **tx))
            .map_err(|e| read_error("list stock movements", e))?;
        rows.iter().map(movement_from_row).collect()
    }
}

impl StockMovementRepository for SqliteStockMovements {
    fn add(&self, movement: NewStockMovement) -> DomainResult<StockMovement> {
        let mut tx = self.0.transaction()?;
        let result = self
            .0
            .block_on(
                sqlx::query(
                    "INSERT INTO stock_movements \
                     (product_id, source_warehouse_id, destination_warehouse_id, quantity, movement_type, timestamp) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(movement.product_id.get())
                .bind(movement.source_warehouse_id.get())
                .bind(movement.destination_warehouse_id.get())
                .bind(i64::from(movement.quantity))
                .bind(movement.movement_type.as_str())
                .bind(movement.timestamp)
                .execute(&mut **tx),
            )
            .map_err(|e| write_error("insert stock movement", e))?;
        movement.into_movement(StockMovementId::new(result.last_insert_rowid()))
    }

    fn get(&self, id: StockMovementId) -> DomainResult<StockMovement> {
        self.fetch("WHERE id = ?", &[id.get()])?
            .pop()
            .ok_or_else(|| DomainError::not_found(StockMovement::KIND, id))
    }

    fn list(&self) -> DomainResult<Vec<StockMovement>> {
        self.fetch("", &[])
    }

    fn list_by_product(&self, product_id: ProductId) -> DomainResult<Vec<StockMovement>> {
        self.fetch("WHERE product_id = ?", &[product_id.get()])
    }

    fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<StockMovement>> {
        self.fetch(
            "WHERE source_warehouse_id = ? OR destination_warehouse_id = ?",
            &[warehouse_id.get(), warehouse_id.get()],
        )
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> DomainResult<T>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("failed to decode column {name}: {e}")))
}

fn count_column(row: &SqliteRow, name: &str) -> DomainResult<u32> {
    let value = column::<i64>(row, name)?;
    u32::try_from(value)
        .map_err(|_| DomainError::storage(format!("column {name} out of range: {value}")))
}

fn product_from_row(row: &SqliteRow) -> DomainResult<Product> {
    let price = column::<i64>(row, "price")?;
    let price = u64::try_from(price)
        .map_err(|_| DomainError::storage(format!("negative price stored: {price}")))?;
    Ok(Product::restore(
        ProductId::new(column(row, "id")?),
        column::<String>(row, "name")?,
        count_column(row, "quantity")?,
        price,
    ))
}

fn warehouse_from_row(row: &SqliteRow) -> DomainResult<Warehouse> {
    Ok(Warehouse::restore(
        WarehouseId::new(column(row, "id")?),
        column::<String>(row, "name")?,
        column::<String>(row, "location")?,
        count_column(row, "capacity")?,
    ))
}

fn stock_item_from_row(row: &SqliteRow) -> DomainResult<StockItem> {
    StockItem::restore(
        StockItemId::new(column(row, "id")?),
        ProductId::new(column(row, "product_id")?),
        WarehouseId::new(column(row, "warehouse_id")?),
        count_column(row, "quantity")?,
        count_column(row, "reserved_quantity")?,
    )
}

fn movement_from_row(row: &SqliteRow) -> DomainResult<StockMovement> {
    let movement_type = column::<String>(row, "movement_type")?
        .parse::<MovementType>()
        .map_err(|e| DomainError::storage(e.to_string()))?;
    let movement = NewStockMovement {
        product_id: ProductId::new(column(row, "product_id")?),
        source_warehouse_id: WarehouseId::new(column(row, "source_warehouse_id")?),
        destination_warehouse_id: WarehouseId::new(column(row, "destination_warehouse_id")?),
        quantity: count_column(row, "quantity")?,
        movement_type,
        timestamp: column::<DateTime<Utc>>(row, "timestamp")?,
    };
    movement
        .into_movement(StockMovementId::new(column(row, "id")?))
        .map_err(|e| DomainError::storage(e.to_string()))
}

fn to_db_amount(value: u64) -> DomainResult<i64> {
    i64::try_from(value)
        .map_err(|_| DomainError::not_persistable(format!("amount {value} exceeds storage range")))
}

fn write_error(operation: &str, err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::not_persistable(format!("{operation}: unique constraint violated: {db}"))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            DomainError::not_persistable(format!("{operation}: missing referenced row: {db}"))
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            DomainError::not_persistable(format!("{operation}: check constraint violated: {db}"))
        }
        _ => DomainError::not_persistable(format!("{operation}: {err}")),
    }
}

fn read_error(operation: &str, err: sqlx::Error) -> DomainError {
    DomainError::storage(format!("{operation}: {err}"))
}
