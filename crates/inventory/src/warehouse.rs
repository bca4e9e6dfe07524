use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, Entity, WarehouseId};

/// A physical stock location.
///
/// Warehouses hold no back-references to their stock items; those are found
/// through the stock item repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warehouse {
    id: WarehouseId,
    name: String,
    location: String,
    capacity: u32,
}

impl Warehouse {
    pub fn restore(
        id: WarehouseId,
        name: impl Into<String>,
        location: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            location: location.into(),
            capacity,
        }
    }

    pub fn id(&self) -> WarehouseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;
    const KIND: &'static str = "warehouse";

    fn id(&self) -> WarehouseId {
        self.id
    }
}

/// A warehouse that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWarehouse {
    pub name: String,
    pub location: String,
    pub capacity: u32,
}

impl NewWarehouse {
    pub fn new(name: impl Into<String>, location: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            capacity,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        Ok(())
    }

    pub fn into_warehouse(self, id: WarehouseId) -> Warehouse {
        Warehouse::restore(id, self.name, self.location, self.capacity)
    }
}
