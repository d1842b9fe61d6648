//! Per-entity field and relation registries.
//!
//! # Responsibility
//! - Describe one entity table: its name, columns and named relations.
//! - Provide `PRAGMA table_info` reflection as the generic fallback for
//!   entities without a hand-declared column list.
//!
//! # Invariants
//! - Descriptors are declared once per entity type and never change while a
//!   repository holds them.
//! - Relation lookup is by exact path-segment name; there is no string
//!   transformation between the wire key and the registry.

use crate::db::DbResult;
use rusqlite::Connection;

/// One named relation from an entity table to a related table.
///
/// Related rows are those satisfying
/// `related.foreign_key = entity.local_key`. Both ownership directions fit
/// this shape: a child collection uses `local_key = "id"` with the child's
/// back-reference as `foreign_key`, while a parent reference uses the local
/// reference column as `local_key` with `foreign_key = "id"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Path segment used in filter keys and eager-load requests.
    pub name: String,
    /// Related table name.
    pub table: String,
    /// Column on the entity table that anchors the join.
    pub local_key: String,
    /// Column on the related table that anchors the join.
    pub foreign_key: String,
}

impl RelationSpec {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }
}

/// Column and relation registry for one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity table name.
    pub table: String,
    /// Declared (or reflected) column names.
    pub columns: Vec<String>,
    /// Declared relations, looked up by path-segment name.
    pub relations: Vec<RelationSpec>,
}

impl EntityDescriptor {
    /// Creates a descriptor with an explicit column list and no relations.
    pub fn new(table: impl Into<String>, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            relations: Vec::new(),
        }
    }

    /// Builds a descriptor by reflecting the live column listing.
    ///
    /// A missing table yields an empty column list; repository construction
    /// rejects that case with a missing-table error.
    pub fn reflect(conn: &Connection, table: impl Into<String>) -> DbResult<Self> {
        let table = table.into();
        let columns = table_columns(conn, &table)?;
        Ok(Self {
            table,
            columns,
            relations: Vec::new(),
        })
    }

    /// Adds one relation to the registry.
    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    /// Returns whether `column` is part of this entity's registry.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Looks up a relation by its path-segment name.
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|relation| relation.name == name)
    }
}

/// Returns whether `table` exists in the live schema.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns the live column listing for `table` in declaration order.
///
/// Returns an empty list when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let mut rows = stmt.query([table])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(0)?);
    }
    Ok(columns)
}
