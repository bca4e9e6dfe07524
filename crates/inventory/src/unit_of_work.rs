//! Unit-of-work protocol.
//!
//! A unit of work is one transaction: it is begun by
//! [`UnitOfWorkFactory::begin`], used through its five repositories, and ended
//! by exactly one of [`UnitOfWork::commit`] or [`UnitOfWork::rollback`]. Both
//! consume the unit of work, so it cannot be reused after it ends; open a new
//! one per transaction.
//!
//! Implementations must roll back when a unit of work is dropped without
//! having been committed. Uncommitted work is never persisted.

use stockroom_core::DomainResult;

use crate::repository::{
    OrderRepository, ProductRepository, StockItemRepository, StockMovementRepository,
    WarehouseRepository,
};

/// One transaction spanning all five repositories.
pub trait UnitOfWork {
    type Products: ProductRepository;
    type Orders: OrderRepository;
    type Warehouses: WarehouseRepository;
    type StockItems: StockItemRepository;
    type StockMovements: StockMovementRepository;

    fn products(&self) -> &Self::Products;
    fn orders(&self) -> &Self::Orders;
    fn warehouses(&self) -> &Self::Warehouses;
    fn stock_items(&self) -> &Self::StockItems;
    fn stock_movements(&self) -> &Self::StockMovements;

    /// Make every write performed through this unit of work durable, atomically.
    fn commit(self) -> DomainResult<()>;

    /// Discard every write performed through this unit of work.
    fn rollback(self) -> DomainResult<()>;
}

/// A store that can open units of work.
pub trait UnitOfWorkFactory {
    type UnitOfWork: UnitOfWork;

    fn begin(&self) -> DomainResult<Self::UnitOfWork>;
}
