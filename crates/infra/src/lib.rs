//! Infrastructure layer: persistence adapters and store configuration.
//!
//! Both adapters implement the repository contracts and the unit-of-work
//! protocol from `stockroom-inventory`:
//!
//! - [`InMemoryStore`] for tests/dev, with optimistic first-committer-wins
//!   commits.
//! - [`SqliteStore`] backed by SQLite through `sqlx`.

pub mod config;
pub mod in_memory;
pub mod sqlite;

pub use config::{StoreBackend, StoreConfig};
pub use in_memory::{InMemoryStore, InMemoryUnitOfWork};
pub use sqlite::{SqliteStore, SqliteUnitOfWork};
