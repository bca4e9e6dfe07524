use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, Entity, ProductId};

/// Catalog product.
///
/// `quantity` is the baseline catalog count recorded at creation; live stock
/// per warehouse is tracked by [`crate::StockItem`]. Products are immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
}

impl Product {
    /// Rebuild a product from stored values.
    pub fn restore(id: ProductId, name: impl Into<String>, quantity: u32, price: u64) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            price,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> u64 {
        self.price
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }
}

/// A product that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub quantity: u32,
    pub price: u64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, quantity: u32, price: u64) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(())
    }

    /// Attach the store-assigned identifier.
    pub fn into_product(self, id: ProductId) -> Product {
        Product::restore(id, self.name, self.quantity, self.price)
    }
}
