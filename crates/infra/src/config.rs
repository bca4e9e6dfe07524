//! Store selection from the environment.
//!
//! `STOCKROOM_DATABASE_URL` picks the backend:
//!
//! - unset, empty or `memory` selects the in-memory store
//! - any `sqlite:` URL (`sqlite://stock.db`, `sqlite::memory:`) selects SQLite

use std::env;

use tracing::{info, warn};

use stockroom_core::{DomainError, DomainResult};

pub const DATABASE_URL_VAR: &str = "STOCKROOM_DATABASE_URL";

const MEMORY: &str = "memory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
        }
    }
}

impl StoreConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = lookup(DATABASE_URL_VAR) else {
            warn!("{DATABASE_URL_VAR} not set, using in-memory store");
            return Ok(Self::default());
        };

        let url = raw.trim();
        let backend = if url.is_empty() || url.eq_ignore_ascii_case(MEMORY) {
            StoreBackend::Memory
        } else if url.starts_with("sqlite:") {
            StoreBackend::Sqlite {
                url: url.to_string(),
            }
        } else {
            return Err(DomainError::validation(format!(
                "{DATABASE_URL_VAR} must be '{MEMORY}' or a sqlite: URL, got '{url}'"
            )));
        };

        info!(backend = backend.name(), "store configured");
        Ok(Self { backend })
    }
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => MEMORY,
            StoreBackend::Sqlite { .. } => "sqlite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(value: Option<&str>) -> DomainResult<StoreConfig> {
        StoreConfig::from_lookup(|key| {
            assert_eq!(key, DATABASE_URL_VAR);
            value.map(str::to_string)
        })
    }

    #[test]
    fn unset_or_blank_means_memory() {
        assert_eq!(config(None).unwrap().backend, StoreBackend::Memory);
        assert_eq!(config(Some("  ")).unwrap().backend, StoreBackend::Memory);
        assert_eq!(config(Some("MEMORY")).unwrap().backend, StoreBackend::Memory);
    }

    #[test]
    fn sqlite_urls_are_kept_verbatim() {
        let backend = config(Some(" sqlite://stock.db ")).unwrap().backend;
        assert_eq!(
            backend,
            StoreBackend::Sqlite {
                url: "sqlite://stock.db".to_string()
            }
        );
        assert_eq!(backend.name(), "sqlite");
    }

    #[test]
    fn other_schemes_are_rejected() {
        let err = config(Some("postgres://localhost/stock")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
