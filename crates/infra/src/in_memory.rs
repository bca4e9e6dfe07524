use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, RwLock};

use tracing::debug;

use stockroom_core::{
    DomainError, DomainResult, Entity, OrderId, ProductId, StockItemId, StockMovementId,
    WarehouseId,
};
use stockroom_inventory::{
    NewOrder, NewProduct, NewStockItem, NewStockMovement, NewWarehouse, Order, OrderRepository,
    Product, ProductRepository, StockItem, StockItemRepository, StockMovement,
    StockMovementRepository, UnitOfWork, UnitOfWorkFactory, Warehouse, WarehouseRepository,
};

/// Rows of one entity keyed by id. Ids only grow, so key order is insertion order.
#[derive(Debug, Clone)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    last_id: i64,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<E> Table<E>
where
    E: Entity + Clone,
    E::Id: From<i64>,
{
    fn next_id(&mut self) -> E::Id {
        self.last_id += 1;
        E::Id::from(self.last_id)
    }

    fn contains(&self, id: E::Id) -> bool {
        self.rows.contains_key(&id)
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(row.id(), row);
    }

    fn get(&self, id: E::Id) -> DomainResult<E> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(E::KIND, id))
    }

    fn replace(&mut self, row: &E) -> DomainResult<()> {
        match self.rows.get_mut(&row.id()) {
            Some(slot) => {
                *slot = row.clone();
                Ok(())
            }
            None => Err(DomainError::not_found(E::KIND, row.id())),
        }
    }

    fn rows(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn list(&self) -> Vec<E> {
        self.rows.values().cloned().collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: Table<Product>,
    orders: Table<Order>,
    warehouses: Table<Warehouse>,
    stock_items: Table<StockItem>,
    stock_movements: Table<StockMovement>,
}

impl Tables {
    /// Referential check standing in for a foreign key.
    fn require_product(&self, id: ProductId) -> DomainResult<()> {
        if self.products.contains(id) {
            Ok(())
        } else {
            Err(DomainError::not_persistable(format!(
                "references missing product {id}"
            )))
        }
    }

    fn require_warehouse(&self, id: WarehouseId) -> DomainResult<()> {
        if self.warehouses.contains(id) {
            Ok(())
        } else {
            Err(DomainError::not_persistable(format!(
                "references missing warehouse {id}"
            )))
        }
    }
}

#[derive(Debug, Default)]
struct Committed {
    tables: Tables,
    /// Bumped on every successful commit.
    version: u64,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Each unit of work works on a private copy of the
/// committed tables and publishes it on commit, so writes are atomic as a
/// group. A commit is refused with `Conflict` if another unit of work
/// committed after this one began. A poisoned lock is a `Storage` failure in
/// both `begin` and `commit`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    committed: Arc<RwLock<Committed>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitOfWorkFactory for InMemoryStore {
    type UnitOfWork = InMemoryUnitOfWork;

    fn begin(&self) -> DomainResult<InMemoryUnitOfWork> {
        let committed = self
            .committed
            .read()
            .map_err(|_| DomainError::storage("lock poisoned"))?;

        let working = Rc::new(RefCell::new(committed.tables.clone()));
        debug!(base_version = committed.version, "unit of work started");

        Ok(InMemoryUnitOfWork {
            store: Arc::clone(&self.committed),
            base_version: committed.version,
            working: Rc::clone(&working),
            products: InMemoryProducts(Rc::clone(&working)),
            orders: InMemoryOrders(Rc::clone(&working)),
            warehouses: InMemoryWarehouses(Rc::clone(&working)),
            stock_items: InMemoryStockItems(Rc::clone(&working)),
            stock_movements: InMemoryStockMovements(working),
            finished: false,
        })
    }
}

/// One transaction against an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    store: Arc<RwLock<Committed>>,
    base_version: u64,
    working: Rc<RefCell<Tables>>,
    products: InMemoryProducts,
    orders: InMemoryOrders,
    warehouses: InMemoryWarehouses,
    stock_items: InMemoryStockItems,
    stock_movements: InMemoryStockMovements,
    finished: bool,
}

impl UnitOfWork for InMemoryUnitOfWork {
    type Products = InMemoryProducts;
    type Orders = InMemoryOrders;
    type Warehouses = InMemoryWarehouses;
    type StockItems = InMemoryStockItems;
    type StockMovements = InMemoryStockMovements;

    fn products(&self) -> &InMemoryProducts {
        &self.products
    }

    fn orders(&self) -> &InMemoryOrders {
        &self.orders
    }

    fn warehouses(&self) -> &InMemoryWarehouses {
        &self.warehouses
    }

    fn stock_items(&self) -> &InMemoryStockItems {
        &self.stock_items
    }

    fn stock_movements(&self) -> &InMemoryStockMovements {
        &self.stock_movements
    }

    fn commit(mut self) -> DomainResult<()> {
        self.finished = true;

        let mut committed = self
            .store
            .write()
            .map_err(|_| DomainError::storage("lock poisoned"))?;

        if committed.version != self.base_version {
            return Err(DomainError::conflict(format!(
                "store advanced to version {} since this unit of work began at {}",
                committed.version, self.base_version
            )));
        }

        committed.tables = self.working.take();
        committed.version += 1;
        debug!(version = committed.version, "unit of work committed");
        Ok(())
    }

    fn rollback(mut self) -> DomainResult<()> {
        self.finished = true;
        debug!(base_version = self.base_version, "unit of work rolled back");
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                base_version = self.base_version,
                "unit of work dropped without commit; discarding staged writes"
            );
        }
    }
}

pub struct InMemoryProducts(Rc<RefCell<Tables>>);
pub struct InMemoryOrders(Rc<RefCell<Tables>>);
pub struct InMemoryWarehouses(Rc<RefCell<Tables>>);
pub struct InMemoryStockItems(Rc<RefCell<Tables>>);
pub struct InMemoryStockMovements(Rc<RefCell<Tables>>);

impl ProductRepository for InMemoryProducts {
    fn add(&self, product: NewProduct) -> DomainResult<Product> {
        let mut tables = self.0.borrow_mut();
        let product = product.into_product(tables.products.next_id());
        tables.products.insert(product.clone());
        Ok(product)
    }

    fn get(&self, id: ProductId) -> DomainResult<Product> {
        self.0.borrow().products.get(id)
    }

    fn list(&self) -> DomainResult<Vec<Product>> {
        Ok(self.0.borrow().products.list())
    }
}

impl OrderRepository for InMemoryOrders {
    fn add(&self, order: NewOrder) -> DomainResult<Order> {
        let mut tables = self.0.borrow_mut();
        for product_id in &order.products {
            tables.require_product(*product_id)?;
        }
        let order = order.into_order(tables.orders.next_id());
        tables.orders.insert(order.clone());
        Ok(order)
    }

    fn get(&self, id: OrderId) -> DomainResult<Order> {
        self.0.borrow().orders.get(id)
    }

    fn list(&self) -> DomainResult<Vec<Order>> {
        Ok(self.0.borrow().orders.list())
    }

    fn update(&self, order: &Order) -> DomainResult<()> {
        let mut tables = self.0.borrow_mut();
        for product_id in order.products() {
            tables.require_product(*product_id)?;
        }
        tables.orders.replace(order)
    }
}

impl WarehouseRepository for InMemoryWarehouses {
    fn add(&self, warehouse: NewWarehouse) -> DomainResult<Warehouse> {
        let mut tables = self.0.borrow_mut();
        let warehouse = warehouse.into_warehouse(tables.warehouses.next_id());
        tables.warehouses.insert(warehouse.clone());
        Ok(warehouse)
    }

    fn get(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        self.0.borrow().warehouses.get(id)
    }

    fn list(&self) -> DomainResult<Vec<Warehouse>> {
        Ok(self.0.borrow().warehouses.list())
    }
}

impl StockItemRepository for InMemoryStockItems {
    fn add(&self, stock_item: NewStockItem) -> DomainResult<StockItem> {
        let mut tables = self.0.borrow_mut();
        tables.require_product(stock_item.product_id)?;
        tables.require_warehouse(stock_item.warehouse_id)?;

        let duplicate = tables.stock_items.rows().any(|existing| {
            existing.product_id() == stock_item.product_id
                && existing.warehouse_id() == stock_item.warehouse_id
        });
        if duplicate {
            return Err(DomainError::not_persistable(format!(
                "stock item for product {} at warehouse {} already exists",
                stock_item.product_id, stock_item.warehouse_id
            )));
        }

        let id: StockItemId = tables.stock_items.next_id();
        let stock_item = stock_item.into_stock_item(id)?;
        tables.stock_items.insert(stock_item.clone());
        Ok(stock_item)
    }

    fn get(&self, id: StockItemId) -> DomainResult<StockItem> {
        self.0.borrow().stock_items.get(id)
    }

    fn list(&self) -> DomainResult<Vec<StockItem>> {
        Ok(self.0.borrow().stock_items.list())
    }

    fn update(&self, stock_item: &StockItem) -> DomainResult<()> {
        self.0.borrow_mut().stock_items.replace(stock_item)
    }

    fn find_by_product_and_warehouse(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Option<StockItem>> {
        Ok(self
            .0
            .borrow()
            .stock_items
            .rows()
            .find(|stock| stock.product_id() == product_id && stock.warehouse_id() == warehouse_id)
            .cloned())
    }
}

impl StockMovementRepository for InMemoryStockMovements {
    fn add(&self, movement: NewStockMovement) -> DomainResult<StockMovement> {
        let mut tables = self.0.borrow_mut();
        tables.require_product(movement.product_id)?;
        tables.require_warehouse(movement.source_warehouse_id)?;
        tables.require_warehouse(movement.destination_warehouse_id)?;

        let id: StockMovementId = tables.stock_movements.next_id();
        let movement = movement.into_movement(id)?;
        tables.stock_movements.insert(movement.clone());
        Ok(movement)
    }

    fn get(&self, id: StockMovementId) -> DomainResult<StockMovement> {
        self.0.borrow().stock_movements.get(id)
    }

    fn list(&self) -> DomainResult<Vec<StockMovement>> {
        Ok(self.0.borrow().stock_movements.list())
    }

    fn list_by_product(&self, product_id: ProductId) -> DomainResult<Vec<StockMovement>> {
        Ok(self
            .0
            .borrow()
            .stock_movements
            .rows()
            .filter(|movement| movement.product_id() == product_id)
            .cloned()
            .collect())
    }

    fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<StockMovement>> {
        Ok(self
            .0
            .borrow()
            .stock_movements
            .rows()
            .filter(|movement| movement.involves(warehouse_id))
            .cloned()
            .collect())
    }
}
