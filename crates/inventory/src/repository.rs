//! Storage-agnostic repository contracts.
//!
//! One trait per entity. Implementations live in the infrastructure layer and
//! are always reached through a [`crate::UnitOfWork`], which gives every
//! repository the same transactional context.
//!
//! ## Common semantics
//!
//! - `add` stores a new record and returns it with its store-assigned id.
//!   A write the store refuses (missing reference, duplicate pairing, broken
//!   invariant, connection failure) is `DomainError::NotPersistable`.
//! - `get` returns the record or `DomainError::NotFound`.
//! - `list` returns every record in insertion order. It re-reads the store on
//!   each call, so it reflects writes made earlier in the same unit of work.

use stockroom_core::{
    DomainError, DomainResult, OrderId, ProductId, StockItemId, StockMovementId, WarehouseId,
};

use crate::movement::{NewStockMovement, StockMovement};
use crate::order::{NewOrder, Order};
use crate::product::{NewProduct, Product};
use crate::stock::{NewStockItem, StockItem};
use crate::warehouse::{NewWarehouse, Warehouse};

pub trait ProductRepository {
    fn add(&self, product: NewProduct) -> DomainResult<Product>;
    fn get(&self, id: ProductId) -> DomainResult<Product>;
    fn list(&self) -> DomainResult<Vec<Product>>;
}

pub trait OrderRepository {
    /// Every referenced product must exist.
    fn add(&self, order: NewOrder) -> DomainResult<Order>;
    fn get(&self, id: OrderId) -> DomainResult<Order>;
    fn list(&self) -> DomainResult<Vec<Order>>;
    /// Persist products appended to an existing order.
    fn update(&self, order: &Order) -> DomainResult<()>;
}

pub trait WarehouseRepository {
    fn add(&self, warehouse: NewWarehouse) -> DomainResult<Warehouse>;
    fn get(&self, id: WarehouseId) -> DomainResult<Warehouse>;
    fn list(&self) -> DomainResult<Vec<Warehouse>>;
}

pub trait StockItemRepository {
    /// At most one stock item may exist per (product, warehouse) pair.
    fn add(&self, stock_item: NewStockItem) -> DomainResult<StockItem>;
    fn get(&self, id: StockItemId) -> DomainResult<StockItem>;
    fn list(&self) -> DomainResult<Vec<StockItem>>;

    /// Persist a changed quantity or reservation.
    fn update(&self, stock_item: &StockItem) -> DomainResult<()>;

    /// Explicit found / not-found lookup for a (product, warehouse) pair.
    fn find_by_product_and_warehouse(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Option<StockItem>>;

    /// Like [`find_by_product_and_warehouse`](Self::find_by_product_and_warehouse),
    /// but absence is `NotFound`.
    fn get_by_product_and_warehouse(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<StockItem> {
        self.find_by_product_and_warehouse(product_id, warehouse_id)?
            .ok_or_else(|| {
                DomainError::not_found(
                    "stock item",
                    format!("product {product_id} @ warehouse {warehouse_id}"),
                )
            })
    }
}

pub trait StockMovementRepository {
    fn add(&self, movement: NewStockMovement) -> DomainResult<StockMovement>;
    fn get(&self, id: StockMovementId) -> DomainResult<StockMovement>;
    fn list(&self) -> DomainResult<Vec<StockMovement>>;
    fn list_by_product(&self, product_id: ProductId) -> DomainResult<Vec<StockMovement>>;
    /// Movements where the warehouse is the source OR the destination.
    fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<StockMovement>>;
}
