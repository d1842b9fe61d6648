//! Generic SQLite-backed repository core.
//!
//! One repository implementation serves every entity table: CRUD, dynamic
//! filtering and search, pagination with navigation links, and unique-slug
//! generation, all parameterized by a per-entity descriptor instead of
//! per-entity code.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod schema;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::Record;
pub use query::page::{Page, PageLinks};
pub use query::params::{normalize_limit, FilterValue, ListParams, SortDirection};
pub use repo::generic::{GenericRepository, RepoError, RepoResult, Repository};
pub use repo::slug::slugify;
pub use schema::descriptor::{EntityDescriptor, RelationSpec};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
