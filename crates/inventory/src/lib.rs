//! Inventory domain module.
//!
//! Entities, repository contracts, the unit-of-work protocol and the
//! `WarehouseService` that keeps stock levels consistent across them. Storage
//! lives behind the traits in [`repository`] and [`unit_of_work`]; this crate
//! performs no IO itself.

pub mod movement;
pub mod order;
pub mod product;
pub mod repository;
pub mod service;
pub mod stock;
pub mod unit_of_work;
pub mod warehouse;

pub use movement::{MovementType, NewStockMovement, StockMovement};
pub use order::{NewOrder, Order};
pub use product::{NewProduct, Product};
pub use repository::{
    OrderRepository, ProductRepository, StockItemRepository, StockMovementRepository,
    WarehouseRepository,
};
pub use service::{atomically, WarehouseService};
pub use stock::{NewStockItem, StockItem};
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
pub use warehouse::{NewWarehouse, Warehouse};

pub use stockroom_core::{
    DomainError, DomainResult, Entity, OrderId, ProductId, StockItemId, StockMovementId,
    WarehouseId,
};
