use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, Entity, ProductId, StockItemId, WarehouseId};

/// The quantity of one product held at one warehouse.
///
/// Stock is split into a reserved portion and an available portion. Every
/// mutator either succeeds leaving `0 <= reserved_quantity <= quantity` or
/// returns an error without touching the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    id: StockItemId,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    quantity: u32,
    reserved_quantity: u32,
}

impl StockItem {
    /// Rebuild a stock item from stored values.
    ///
    /// Rows that break the reservation invariant are reported as a storage
    /// failure rather than silently clamped.
    pub fn restore(
        id: StockItemId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: u32,
        reserved_quantity: u32,
    ) -> DomainResult<Self> {
        if reserved_quantity > quantity {
            return Err(DomainError::storage(format!(
                "stock item {id} has reserved {reserved_quantity} > quantity {quantity}"
            )));
        }
        Ok(Self {
            id,
            product_id,
            warehouse_id,
            quantity,
            reserved_quantity,
        })
    }

    pub fn id(&self) -> StockItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn reserved_quantity(&self) -> u32 {
        self.reserved_quantity
    }

    /// Stock that is neither reserved nor gone: `quantity - reserved_quantity`.
    pub fn available(&self) -> u32 {
        self.quantity - self.reserved_quantity
    }

    /// Add physically received units. Reservations are untouched.
    pub fn receive(&mut self, amount: u32) -> DomainResult<()> {
        ensure_positive(amount)?;
        self.quantity = self.quantity.checked_add(amount).ok_or_else(|| {
            DomainError::validation(format!(
                "receiving {amount} would overflow quantity {}",
                self.quantity
            ))
        })?;
        Ok(())
    }

    /// Remove unreserved units (e.g. the source side of a transfer).
    pub fn withdraw(&mut self, amount: u32) -> DomainResult<()> {
        ensure_positive(amount)?;
        let available = self.available();
        if amount > available {
            return Err(DomainError::insufficient_stock(amount, available));
        }
        self.quantity -= amount;
        Ok(())
    }

    /// Put a soft hold on unreserved units.
    pub fn reserve(&mut self, amount: u32) -> DomainResult<()> {
        ensure_positive(amount)?;
        let available = self.available();
        if amount > available {
            return Err(DomainError::insufficient_stock(amount, available));
        }
        self.reserved_quantity += amount;
        Ok(())
    }

    /// Give back previously reserved units.
    pub fn release(&mut self, amount: u32) -> DomainResult<()> {
        ensure_positive(amount)?;
        if amount > self.reserved_quantity {
            return Err(DomainError::over_release(amount, self.reserved_quantity));
        }
        self.reserved_quantity -= amount;
        Ok(())
    }
}

impl Entity for StockItem {
    type Id = StockItemId;
    const KIND: &'static str = "stock item";

    fn id(&self) -> StockItemId {
        self.id
    }
}

/// A stock item that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockItem {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: u32,
    pub reserved_quantity: u32,
}

impl NewStockItem {
    /// First stock for a (product, warehouse) pair: nothing reserved yet.
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId, quantity: u32) -> Self {
        Self {
            product_id,
            warehouse_id,
            quantity,
            reserved_quantity: 0,
        }
    }

    /// Attach the store-assigned identifier.
    ///
    /// Fails with `NotPersistable` when the values break the reservation
    /// invariant, the same way a relational CHECK constraint would.
    pub fn into_stock_item(self, id: StockItemId) -> DomainResult<StockItem> {
        StockItem::restore(
            id,
            self.product_id,
            self.warehouse_id,
            self.quantity,
            self.reserved_quantity,
        )
        .map_err(|_| {
            DomainError::not_persistable(format!(
                "reserved_quantity {} exceeds quantity {}",
                self.reserved_quantity, self.quantity
            ))
        })
    }
}

fn ensure_positive(amount: u32) -> DomainResult<()> {
    if amount == 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(())
}
