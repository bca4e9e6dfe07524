//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer and its repository contracts.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Repository lookups, stock arithmetic and the persistence adapters all report
/// through this one type, so a failure deep inside a unit of work reaches the
/// caller of `WarehouseService` unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An entity (or a product/warehouse stock pairing) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A reservation or transfer asked for more than the unreserved stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// A release asked for more than is currently reserved.
    #[error("cannot release {requested}: only {reserved} reserved")]
    OverRelease { requested: u32, reserved: u32 },

    /// The underlying store rejected a write (constraint, connection, commit).
    #[error("not persistable: {0}")]
    NotPersistable(String),

    /// Caller input failed validation (e.g. zero quantity, blank name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Another unit of work committed first.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed a read or a transaction-control operation.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(requested: u32, available: u32) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn over_release(requested: u32, reserved: u32) -> Self {
        Self::OverRelease {
            requested,
            reserved,
        }
    }

    pub fn not_persistable(msg: impl Into<String>) -> Self {
        Self::NotPersistable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for the "entity or pairing absent" family of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_numbers_involved() {
        let err = DomainError::insufficient_stock(5, 2);
        assert_eq!(
            err.to_string(),
            "insufficient stock: requested 5, available 2"
        );

        let err = DomainError::over_release(4, 3);
        assert_eq!(err.to_string(), "cannot release 4: only 3 reserved");
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let err = DomainError::not_found("stock item", "product 3 @ warehouse 7");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "stock item not found: product 3 @ warehouse 7"
        );
        assert!(!DomainError::validation("x").is_not_found());
    }
}
