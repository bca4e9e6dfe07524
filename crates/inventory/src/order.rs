use serde::Serialize;

use stockroom_core::{Entity, OrderId, ProductId};

/// An order: an ordered list of product references.
///
/// Products are referenced by id, never copied. The same product may appear
/// more than once. Products are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    products: Vec<ProductId>,
}

impl Order {
    pub fn restore(id: OrderId, products: Vec<ProductId>) -> Self {
        Self { id, products }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub fn add_product(&mut self, product: ProductId) {
        self.products.push(product);
    }
}

impl Entity for Order {
    type Id = OrderId;
    const KIND: &'static str = "order";

    fn id(&self) -> OrderId {
        self.id
    }
}

/// An order that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrder {
    pub products: Vec<ProductId>,
}

impl NewOrder {
    pub fn new(products: Vec<ProductId>) -> Self {
        Self { products }
    }

    pub fn into_order(self, id: OrderId) -> Order {
        Order::restore(id, self.products)
    }
}
