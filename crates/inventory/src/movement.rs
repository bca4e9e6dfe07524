use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, Entity, ProductId, StockMovementId, WarehouseId};

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Receipt,
    Shipment,
    Transfer,
}

impl MovementType {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Receipt => "receipt",
            MovementType::Shipment => "shipment",
            MovementType::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receipt" => Ok(MovementType::Receipt),
            "shipment" => Ok(MovementType::Shipment),
            "transfer" => Ok(MovementType::Transfer),
            other => Err(DomainError::validation(format!(
                "unknown movement type '{other}'"
            ))),
        }
    }
}

/// Immutable audit record of stock moving between warehouses.
///
/// Movements are written once and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    id: StockMovementId,
    product_id: ProductId,
    source_warehouse_id: WarehouseId,
    destination_warehouse_id: WarehouseId,
    quantity: u32,
    movement_type: MovementType,
    timestamp: DateTime<Utc>,
}

impl StockMovement {
    pub fn id(&self) -> StockMovementId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn source_warehouse_id(&self) -> WarehouseId {
        self.source_warehouse_id
    }

    pub fn destination_warehouse_id(&self) -> WarehouseId {
        self.destination_warehouse_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// True when the warehouse is the source OR the destination.
    pub fn involves(&self, warehouse_id: WarehouseId) -> bool {
        self.source_warehouse_id == warehouse_id || self.destination_warehouse_id == warehouse_id
    }
}

impl Entity for StockMovement {
    type Id = StockMovementId;
    const KIND: &'static str = "stock movement";

    fn id(&self) -> StockMovementId {
        self.id
    }
}

/// A movement that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockMovement {
    pub product_id: ProductId,
    pub source_warehouse_id: WarehouseId,
    pub destination_warehouse_id: WarehouseId,
    pub quantity: u32,
    pub movement_type: MovementType,
    pub timestamp: DateTime<Utc>,
}

impl NewStockMovement {
    pub fn transfer(
        product_id: ProductId,
        source_warehouse_id: WarehouseId,
        destination_warehouse_id: WarehouseId,
        quantity: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            source_warehouse_id,
            destination_warehouse_id,
            quantity,
            movement_type: MovementType::Transfer,
            timestamp,
        }
    }

    /// Attach the store-assigned identifier.
    ///
    /// A movement of zero units is `NotPersistable`.
    pub fn into_movement(self, id: StockMovementId) -> DomainResult<StockMovement> {
        if self.quantity == 0 {
            return Err(DomainError::not_persistable(
                "stock movement quantity must be greater than zero",
            ));
        }
        Ok(StockMovement {
            id,
            product_id: self.product_id,
            source_warehouse_id: self.source_warehouse_id,
            destination_warehouse_id: self.destination_warehouse_id,
            quantity: self.quantity,
            movement_type: self.movement_type,
            timestamp: self.timestamp,
        })
    }
}
