//! Warehouse service: multi-entity stock operations.
//!
//! The service borrows a [`UnitOfWork`] and runs every operation inside it. It
//! performs no local recovery: any failure is returned unchanged and the
//! caller is expected to drop (or roll back) the unit of work, which discards
//! every write the failed operation had already staged. [`atomically`] wraps
//! that protocol for the common case.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use stockroom_core::{DomainError, DomainResult, OrderId, ProductId, WarehouseId};

use crate::movement::{NewStockMovement, StockMovement};
use crate::order::{NewOrder, Order};
use crate::product::{NewProduct, Product};
use crate::repository::{
    OrderRepository, ProductRepository, StockItemRepository, StockMovementRepository,
    WarehouseRepository,
};
use crate::stock::{NewStockItem, StockItem};
use crate::unit_of_work::UnitOfWork;
use crate::warehouse::{NewWarehouse, Warehouse};

/// Stateless orchestration over the repositories of one unit of work.
pub struct WarehouseService<'u, U> {
    uow: &'u U,
}

impl<'u, U: UnitOfWork> WarehouseService<'u, U> {
    pub fn new(uow: &'u U) -> Self {
        Self { uow }
    }

    #[instrument(skip(self), err)]
    pub fn create_product(&self, name: &str, quantity: u32, price: u64) -> DomainResult<Product> {
        let draft = NewProduct::new(name, quantity, price);
        draft.validate()?;
        let product = self.uow.products().add(draft)?;
        info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub fn create_warehouse(
        &self,
        name: &str,
        location: &str,
        capacity: u32,
    ) -> DomainResult<Warehouse> {
        let draft = NewWarehouse::new(name, location, capacity);
        draft.validate()?;
        let warehouse = self.uow.warehouses().add(draft)?;
        info!(warehouse_id = %warehouse.id(), "warehouse created");
        Ok(warehouse)
    }

    /// Wrap product references into a new order. Stock is not touched.
    #[instrument(skip(self, products), fields(product_count = products.len()), err)]
    pub fn create_order(&self, products: &[Product]) -> DomainResult<Order> {
        let draft = NewOrder::new(products.iter().map(Product::id).collect());
        let order = self.uow.orders().add(draft)?;
        info!(order_id = %order.id(), "order created");
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub fn add_product_to_order(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> DomainResult<Order> {
        let mut order = self.uow.orders().get(order_id)?;
        self.uow.products().get(product_id)?;
        order.add_product(product_id);
        self.uow.orders().update(&order)?;
        debug!(products = order.products().len(), "product appended to order");
        Ok(order)
    }

    /// Receive `quantity` units of a product at a warehouse.
    ///
    /// Creates the (product, warehouse) stock item on first receipt, otherwise
    /// increments it. Reservations are untouched.
    #[instrument(
        skip(self, product, warehouse),
        fields(product_id = %product.id(), warehouse_id = %warehouse.id()),
        err
    )]
    pub fn add_stock_to_warehouse(
        &self,
        product: &Product,
        warehouse: &Warehouse,
        quantity: u32,
    ) -> DomainResult<StockItem> {
        ensure_positive(quantity)?;
        self.ensure_exists(product.id(), warehouse.id())?;
        let stock = self.receive(product.id(), warehouse.id(), quantity)?;
        info!(
            quantity = stock.quantity(),
            reserved = stock.reserved_quantity(),
            "stock added"
        );
        Ok(stock)
    }

    #[instrument(
        skip(self, product, warehouse),
        fields(product_id = %product.id(), warehouse_id = %warehouse.id()),
        err
    )]
    pub fn reserve_stock(
        &self,
        product: &Product,
        warehouse: &Warehouse,
        quantity: u32,
    ) -> DomainResult<StockItem> {
        ensure_positive(quantity)?;
        let stock_items = self.uow.stock_items();
        let mut stock = stock_items.get_by_product_and_warehouse(product.id(), warehouse.id())?;
        stock.reserve(quantity)?;
        stock_items.update(&stock)?;
        info!(reserved = stock.reserved_quantity(), "stock reserved");
        Ok(stock)
    }

    #[instrument(
        skip(self, product, warehouse),
        fields(product_id = %product.id(), warehouse_id = %warehouse.id()),
        err
    )]
    pub fn release_reserved_stock(
        &self,
        product: &Product,
        warehouse: &Warehouse,
        quantity: u32,
    ) -> DomainResult<StockItem> {
        ensure_positive(quantity)?;
        let stock_items = self.uow.stock_items();
        let mut stock = stock_items.get_by_product_and_warehouse(product.id(), warehouse.id())?;
        stock.release(quantity)?;
        stock_items.update(&stock)?;
        info!(reserved = stock.reserved_quantity(), "reservation released");
        Ok(stock)
    }

    /// Move unreserved stock between warehouses and record the movement.
    ///
    /// Reserved units at the source are not transferable, and reservations are
    /// never released by a transfer. All writes go through the same unit of
    /// work; on error none of them may be committed.
    #[instrument(
        skip(self, product, source, destination),
        fields(
            product_id = %product.id(),
            source_id = %source.id(),
            destination_id = %destination.id()
        ),
        err
    )]
    pub fn transfer_stock(
        &self,
        product: &Product,
        source: &Warehouse,
        destination: &Warehouse,
        quantity: u32,
    ) -> DomainResult<StockMovement> {
        ensure_positive(quantity)?;
        if source.id() == destination.id() {
            return Err(DomainError::validation(
                "source and destination warehouse must differ",
            ));
        }

        let stock_items = self.uow.stock_items();
        let mut source_stock =
            stock_items.get_by_product_and_warehouse(product.id(), source.id())?;
        source_stock.withdraw(quantity)?;

        self.ensure_exists(product.id(), destination.id())?;
        stock_items.update(&source_stock)?;
        let destination_stock = self.receive(product.id(), destination.id(), quantity)?;

        let movement = self.uow.stock_movements().add(NewStockMovement::transfer(
            product.id(),
            source.id(),
            destination.id(),
            quantity,
            Utc::now(),
        ))?;

        info!(
            movement_id = %movement.id(),
            source_quantity = source_stock.quantity(),
            destination_quantity = destination_stock.quantity(),
            "stock transferred"
        );
        Ok(movement)
    }

    /// Current stock of a product at a warehouse (`NotFound` if never stocked).
    pub fn stock_level(&self, product: &Product, warehouse: &Warehouse) -> DomainResult<StockItem> {
        self.uow
            .stock_items()
            .get_by_product_and_warehouse(product.id(), warehouse.id())
    }

    /// Units of a product across every warehouse, reserved ones included.
    pub fn total_quantity(&self, product: &Product) -> DomainResult<u64> {
        Ok(self
            .uow
            .stock_items()
            .list()?
            .iter()
            .filter(|stock| stock.product_id() == product.id())
            .map(|stock| u64::from(stock.quantity()))
            .sum())
    }

    pub fn movements_for_product(&self, product: &Product) -> DomainResult<Vec<StockMovement>> {
        self.uow.stock_movements().list_by_product(product.id())
    }

    /// Movements leaving or entering the warehouse.
    pub fn movements_for_warehouse(
        &self,
        warehouse: &Warehouse,
    ) -> DomainResult<Vec<StockMovement>> {
        self.uow.stock_movements().list_by_warehouse(warehouse.id())
    }

    fn ensure_exists(&self, product_id: ProductId, warehouse_id: WarehouseId) -> DomainResult<()> {
        self.uow.products().get(product_id)?;
        self.uow.warehouses().get(warehouse_id)?;
        Ok(())
    }

    /// Lookup-then-create: increment the pair's stock item, or create it.
    fn receive(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: u32,
    ) -> DomainResult<StockItem> {
        let stock_items = self.uow.stock_items();
        match stock_items.find_by_product_and_warehouse(product_id, warehouse_id)? {
            Some(mut stock) => {
                stock.receive(quantity)?;
                stock_items.update(&stock)?;
                Ok(stock)
            }
            None => {
                debug!(%product_id, %warehouse_id, "first stock for pair");
                stock_items.add(NewStockItem::new(product_id, warehouse_id, quantity))
            }
        }
    }
}

/// Run `operation` against a fresh service and end the unit of work.
///
/// Commits when the operation succeeds. Otherwise rolls back and returns the
/// operation's error unchanged.
pub fn atomically<U, T, F>(uow: U, operation: F) -> DomainResult<T>
where
    U: UnitOfWork,
    F: FnOnce(&WarehouseService<'_, U>) -> DomainResult<T>,
{
    let outcome = operation(&WarehouseService::new(&uow));
    match outcome {
        Ok(value) => {
            uow.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback() {
                warn!(error = %rollback_err, "rollback after failed operation also failed");
            }
            Err(err)
        }
    }
}

fn ensure_positive(quantity: u32) -> DomainResult<()> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(())
}
