//! Entity-agnostic repository over one SQLite table.
//!
//! # Responsibility
//! - Provide CRUD, lookup, slug and list/paginate operations for any entity
//!   table described by an [`EntityDescriptor`].
//! - Assemble dynamic SQL from typed list parameters with positional binds.
//!
//! # Invariants
//! - Construction validates the descriptor against the live schema; after
//!   that, every interpolated identifier is known to exist.
//! - `list` drops unknown filter/sort/select names silently; direct-column
//!   APIs (`get_by_column_value`, `delete_many_by_column_value`) reject
//!   unknown columns with [`RepoError::UnknownColumn`].
//! - Repeated `list` calls with identical parameters produce identical SQL
//!   text and identical pagination links.

use crate::db::DbError;
use crate::model::record::Record;
use crate::query::page::Page;
use crate::query::params::{normalize_limit, FilterValue, ListParams};
use crate::repo::slug::{next_unique_slug, slugify};
use crate::schema::descriptor::{table_columns, table_exists, EntityDescriptor, RelationSpec};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from generic repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Required row does not exist for an operation that demands existence.
    NotFound { table: String, key: String },
    /// Write rejected because required fields are absent or unusable.
    Validation { table: String, message: String },
    /// Write rejected by a uniqueness/foreign-key constraint.
    Constraint { table: String, message: String },
    /// Direct-column API received a column outside the entity registry.
    UnknownColumn { table: String, column: String },
    /// Eager-load requested a relation outside the entity registry.
    UnknownRelation { table: String, relation: String },
    /// Descriptor references a table missing from the live schema.
    MissingRequiredTable(String),
    /// Descriptor references a column missing from the live schema.
    MissingRequiredColumn { table: String, column: String },
    /// Persisted data cannot be converted into a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, key } => {
                write!(f, "no `{table}` row matches `{key}`")
            }
            Self::Validation { table, message } => {
                write!(f, "invalid `{table}` write: {message}")
            }
            Self::Constraint { table, message } => {
                write!(f, "`{table}` write violates a constraint: {message}")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "`{table}` has no column `{column}`")
            }
            Self::UnknownRelation { table, relation } => {
                write!(f, "`{table}` has no relation `{relation}`")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing from the schema")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` is missing required column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Field → value pairs for write operations.
pub type Fields<'a> = [(&'a str, Value)];

/// Entity-agnostic persistence contract.
///
/// One implementation serves every entity type; the bound descriptor decides
/// which table, columns and relations the operations touch.
pub trait Repository {
    /// Inserts one row and returns the created record.
    fn create(&self, data: &Fields<'_>) -> RepoResult<Record>;
    /// Bulk-inserts rows in one statement; returns the inserted count.
    fn insert_many(&self, rows: &[&Fields<'_>]) -> RepoResult<usize>;
    /// Applies a partial update and returns the post-update record.
    fn update(&self, id: i64, data: &Fields<'_>) -> RepoResult<Record>;
    /// Deletes one row by primary key.
    fn delete(&self, id: i64) -> RepoResult<()>;
    /// Fetches one row by primary key.
    fn get_by_id(&self, id: i64) -> RepoResult<Record>;
    /// Returns the first row matching `column = value`, if any.
    fn get_by_column_value(&self, column: &str, value: &Value) -> RepoResult<Option<Record>>;
    /// Deletes all rows whose `column` value is in `values`.
    fn delete_many_by_column_value(&self, column: &str, values: &[Value]) -> RepoResult<usize>;
    /// Resolves `key` by primary key when numeric, by `slug` otherwise.
    fn get_by_id_or_slug(&self, key: &str) -> RepoResult<Record>;
    /// Generates the next collision-free slug for `name`.
    fn create_unique_slug(&self, name: &str) -> RepoResult<String>;
    /// Runs the dynamic list/filter/search/paginate query.
    fn list(&self, params: &ListParams, base_path: &str) -> RepoResult<Page>;
}

/// SQLite-backed generic repository bound to one entity table.
pub struct GenericRepository<'conn> {
    conn: &'conn Connection,
    descriptor: EntityDescriptor,
    /// Live column listing per relation name, cached at construction so
    /// related-column filters can be whitelisted without re-reflection.
    relation_columns: BTreeMap<String, Vec<String>>,
}

impl<'conn> GenericRepository<'conn> {
    /// Binds a repository to `descriptor`, validating it against the live
    /// schema.
    pub fn try_new(conn: &'conn Connection, descriptor: EntityDescriptor) -> RepoResult<Self> {
        if !table_exists(conn, &descriptor.table)? {
            return Err(RepoError::MissingRequiredTable(descriptor.table.clone()));
        }

        let live_columns = table_columns(conn, &descriptor.table)?;
        for column in &descriptor.columns {
            if !live_columns.iter().any(|name| name == column) {
                return Err(RepoError::MissingRequiredColumn {
                    table: descriptor.table.clone(),
                    column: column.clone(),
                });
            }
        }
        if !descriptor.has_column("id") {
            return Err(RepoError::MissingRequiredColumn {
                table: descriptor.table.clone(),
                column: "id".to_string(),
            });
        }

        let mut relation_columns = BTreeMap::new();
        for relation in &descriptor.relations {
            if !descriptor.has_column(&relation.local_key) {
                return Err(RepoError::MissingRequiredColumn {
                    table: descriptor.table.clone(),
                    column: relation.local_key.clone(),
                });
            }
            if !table_exists(conn, &relation.table)? {
                return Err(RepoError::MissingRequiredTable(relation.table.clone()));
            }
            let columns = table_columns(conn, &relation.table)?;
            if !columns.iter().any(|name| name == &relation.foreign_key) {
                return Err(RepoError::MissingRequiredColumn {
                    table: relation.table.clone(),
                    column: relation.foreign_key.clone(),
                });
            }
            relation_columns.insert(relation.name.clone(), columns);
        }

        Ok(Self {
            conn,
            descriptor,
            relation_columns,
        })
    }

    /// Binds a repository to `table` using live-schema reflection for the
    /// column registry (no relations).
    pub fn reflect(conn: &'conn Connection, table: impl Into<String>) -> RepoResult<Self> {
        let descriptor = EntityDescriptor::reflect(conn, table)?;
        Self::try_new(conn, descriptor)
    }

    /// Returns the bound entity descriptor.
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    fn table(&self) -> &str {
        &self.descriptor.table
    }

    /// Keeps only pairs whose column is part of the entity registry.
    fn whitelist_fields<'a>(&self, data: &'a Fields<'_>) -> Vec<(&'a str, Value)> {
        data.iter()
            .filter(|(column, _)| self.descriptor.has_column(column))
            .map(|(column, value)| (*column, value.clone()))
            .collect()
    }

    fn require_column(&self, column: &str) -> RepoResult<()> {
        if self.descriptor.has_column(column) {
            return Ok(());
        }
        Err(RepoError::UnknownColumn {
            table: self.table().to_string(),
            column: column.to_string(),
        })
    }

    /// Classifies write failures: NOT NULL violations are validation errors
    /// (a required field was absent), all other constraint failures are
    /// constraint errors. Everything else stays a transport error.
    fn classify_write_error(&self, err: rusqlite::Error) -> RepoError {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                let message = message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string());
                if code.extended_code == ffi::SQLITE_CONSTRAINT_NOTNULL {
                    return RepoError::Validation {
                        table: self.table().to_string(),
                        message,
                    };
                }
                return RepoError::Constraint {
                    table: self.table().to_string(),
                    message,
                };
            }
        }
        err.into()
    }

    fn fetch_records(&self, sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Record::from_row(row, &columns)?);
        }
        Ok(records)
    }

    fn not_found(&self, key: impl Display) -> RepoError {
        RepoError::NotFound {
            table: self.table().to_string(),
            key: key.to_string(),
        }
    }

    /// Loads related rows for one relation and attaches them to each page
    /// item, grouped by the join key.
    fn attach_relation(&self, items: &mut [Record], relation: &RelationSpec) -> RepoResult<()> {
        let mut keys: Vec<Value> = Vec::new();
        for item in items.iter() {
            match item.get(&relation.local_key) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    if !keys.contains(value) {
                        keys.push(value.clone());
                    }
                }
            }
        }

        let related = if keys.is_empty() {
            Vec::new()
        } else {
            let placeholders = vec!["?"; keys.len()].join(", ");
            let sql = format!(
                "SELECT * FROM {} WHERE {} IN ({placeholders})",
                relation.table, relation.foreign_key
            );
            self.fetch_records(&sql, keys)?
        };

        for item in items {
            let matched = match item.get(&relation.local_key) {
                Some(Value::Null) | None => Vec::new(),
                Some(parent_key) => related
                    .iter()
                    .filter(|row| row.get(&relation.foreign_key) == Some(parent_key))
                    .cloned()
                    .collect(),
            };
            item.relations.insert(relation.name.clone(), matched);
        }

        Ok(())
    }
}

impl Repository for GenericRepository<'_> {
    fn create(&self, data: &Fields<'_>) -> RepoResult<Record> {
        let fields = self.whitelist_fields(data);
        if fields.is_empty() {
            return Err(RepoError::Validation {
                table: self.table().to_string(),
                message: "payload contains no recognized columns".to_string(),
            });
        }

        let columns = fields
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; fields.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            self.table()
        );
        let binds: Vec<Value> = fields.into_iter().map(|(_, value)| value).collect();

        self.conn
            .execute(&sql, params_from_iter(binds))
            .map_err(|err| self.classify_write_error(err))?;

        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn insert_many(&self, rows: &[&Fields<'_>]) -> RepoResult<usize> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };

        // The first row fixes the column set; later rows fill gaps with NULL.
        let columns: Vec<&str> = first
            .iter()
            .map(|(column, _)| *column)
            .filter(|column| self.descriptor.has_column(column))
            .collect();
        if columns.is_empty() {
            return Err(RepoError::Validation {
                table: self.table().to_string(),
                message: "payload contains no recognized columns".to_string(),
            });
        }

        let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let all_placeholders = vec![row_placeholders; rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {all_placeholders}",
            self.table(),
            columns.join(", ")
        );

        let mut binds: Vec<Value> = Vec::with_capacity(columns.len() * rows.len());
        for row in rows {
            for column in &columns {
                let value = row
                    .iter()
                    .find(|(name, _)| name == column)
                    .map_or(Value::Null, |(_, value)| value.clone());
                binds.push(value);
            }
        }

        self.conn
            .execute(&sql, params_from_iter(binds))
            .map_err(|err| self.classify_write_error(err))
    }

    fn update(&self, id: i64, data: &Fields<'_>) -> RepoResult<Record> {
        let fields = self.whitelist_fields(data);
        if fields.is_empty() {
            // Nothing to change; existence still has to hold.
            return self.get_by_id(id);
        }

        let assignments = fields
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", self.table());
        let mut binds: Vec<Value> = fields.into_iter().map(|(_, value)| value).collect();
        binds.push(Value::Integer(id));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(binds))
            .map_err(|err| self.classify_write_error(err))?;
        if changed == 0 {
            return Err(self.not_found(id));
        }

        self.get_by_id(id)
    }

    fn delete(&self, id: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", self.table()),
            [Value::Integer(id)],
        )?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> RepoResult<Record> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.table());
        let records = self.fetch_records(&sql, vec![Value::Integer(id)])?;
        records.into_iter().next().ok_or_else(|| self.not_found(id))
    }

    fn get_by_column_value(&self, column: &str, value: &Value) -> RepoResult<Option<Record>> {
        self.require_column(column)?;
        let sql = format!("SELECT * FROM {} WHERE {column} = ? LIMIT 1", self.table());
        let records = self.fetch_records(&sql, vec![value.clone()])?;
        Ok(records.into_iter().next())
    }

    fn delete_many_by_column_value(&self, column: &str, values: &[Value]) -> RepoResult<usize> {
        self.require_column(column)?;
        if values.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE {column} IN ({placeholders})",
            self.table()
        );
        let changed = self.conn.execute(&sql, params_from_iter(values.to_vec()))?;
        Ok(changed)
    }

    fn get_by_id_or_slug(&self, key: &str) -> RepoResult<Record> {
        if let Ok(id) = key.parse::<i64>() {
            return self.get_by_id(id);
        }

        self.require_column("slug")?;
        let sql = format!("SELECT * FROM {} WHERE slug = ?", self.table());
        let records = self.fetch_records(&sql, vec![Value::Text(key.to_string())])?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(key))
    }

    fn create_unique_slug(&self, name: &str) -> RepoResult<String> {
        self.require_column("slug")?;

        let slug = slugify(name);
        if slug.is_empty() {
            return Err(RepoError::Validation {
                table: self.table().to_string(),
                message: format!("name `{name}` does not produce a usable slug"),
            });
        }

        let sql = format!(
            "SELECT slug FROM {} WHERE slug = ?1 OR slug LIKE ?2",
            self.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(vec![
            Value::Text(slug.clone()),
            Value::Text(format!("{slug}-%")),
        ]))?;

        let mut existing = Vec::new();
        while let Some(row) = rows.next()? {
            if let Value::Text(candidate) = row.get::<_, Value>(0)? {
                existing.push(candidate);
            }
        }

        let unique = next_unique_slug(&slug, &existing);
        debug!(
            "event=slug module=repo table={} status=ok candidates={} slug={unique}",
            self.table(),
            existing.len()
        );
        Ok(unique)
    }

    fn list(&self, params: &ListParams, base_path: &str) -> RepoResult<Page> {
        let started_at = Instant::now();
        let descriptor = &self.descriptor;

        let sort_column = params
            .sort_field
            .as_deref()
            .filter(|field| descriptor.has_column(field))
            .unwrap_or("id");

        let mut and_clauses: Vec<String> = Vec::new();
        let mut or_clauses: Vec<String> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();
        // Local columns referenced by relation filters; the projection must
        // keep them so the join anchors stay resolvable.
        let mut relation_locals: Vec<String> = Vec::new();

        if let (Some(field), Some(value)) = (&params.filter_field, &params.filter_value) {
            if descriptor.has_column(field) {
                and_clauses.push(format!("{field} = ?"));
                binds.push(Value::Text(value.clone()));
            }
        }

        for (column, present) in &params.has {
            if !descriptor.has_column(column) {
                continue;
            }
            and_clauses.push(if *present {
                format!("{column} IS NOT NULL")
            } else {
                format!("{column} IS NULL")
            });
        }

        for (key, value) in &params.filter {
            match key.split_once('.') {
                None => {
                    if !descriptor.has_column(key) {
                        continue;
                    }
                    match value {
                        FilterValue::Many(values) => {
                            if values.is_empty() {
                                continue;
                            }
                            let group = vec![format!("{key} LIKE ?"); values.len()].join(" OR ");
                            and_clauses.push(format!("({group})"));
                            for value in values {
                                binds.push(Value::Text(format!("%{value}%")));
                            }
                        }
                        FilterValue::One(value) if value.is_empty() || value == "null" => {
                            and_clauses.push(format!("{key} IS NULL"));
                        }
                        FilterValue::One(value) => {
                            and_clauses.push(format!("{key} LIKE ?"));
                            binds.push(Value::Text(format!("%{value}%")));
                        }
                    }
                }
                Some((relation_name, related_column)) => {
                    let Some(relation) = descriptor.relation(relation_name) else {
                        continue;
                    };
                    let known_column = self
                        .relation_columns
                        .get(relation_name)
                        .is_some_and(|columns| {
                            columns.iter().any(|name| name == related_column)
                        });
                    if !known_column {
                        continue;
                    }

                    let qualified = format!("{}.{related_column}", relation.table);
                    let inner = match value {
                        FilterValue::Many(values) => {
                            if values.is_empty() {
                                continue;
                            }
                            for value in values {
                                binds.push(Value::Text(format!("%{value}%")));
                            }
                            format!(
                                "({})",
                                vec![format!("{qualified} LIKE ?"); values.len()].join(" OR ")
                            )
                        }
                        FilterValue::One(value) => {
                            binds.push(Value::Text(format!("%{value}%")));
                            format!("{qualified} LIKE ?")
                        }
                    };

                    relation_locals.push(relation.local_key.clone());
                    and_clauses.push(format!(
                        "EXISTS (SELECT 1 FROM {rt} WHERE {rt}.{fk} = {t}.{lk} AND {inner})",
                        rt = relation.table,
                        fk = relation.foreign_key,
                        t = descriptor.table,
                        lk = relation.local_key,
                    ));
                }
            }
        }

        if let Some(q) = &params.q {
            let group = descriptor
                .columns
                .iter()
                .map(|column| format!("{column} LIKE ?"))
                .collect::<Vec<_>>()
                .join(" OR ");
            and_clauses.push(format!("({group})"));
            for _ in &descriptor.columns {
                binds.push(Value::Text(format!("%{q}%")));
            }
        }

        if descriptor.has_column("created_at") {
            if let Some(start_date) = &params.start_date {
                and_clauses.push("created_at >= ?".to_string());
                binds.push(Value::Text(format!("{start_date} 00:00:00")));
            }
            if let Some(end_date) = &params.end_date {
                and_clauses.push("created_at <= ?".to_string());
                binds.push(Value::Text(format!("{end_date} 23:59:59")));
            }
        }

        for (column, value) in &params.where_any {
            if !descriptor.has_column(column) {
                continue;
            }
            or_clauses.push(format!("{column} = ?"));
            binds.push(Value::Text(value.clone()));
        }

        // OR pairs append after the conjunction, so the conjunction as a
        // whole is one alternative among them.
        let where_sql = if and_clauses.is_empty() && or_clauses.is_empty() {
            String::new()
        } else if and_clauses.is_empty() {
            format!(" WHERE {}", or_clauses.join(" OR "))
        } else {
            let mut text = format!(" WHERE {}", and_clauses.join(" AND "));
            for clause in &or_clauses {
                text.push_str(" OR ");
                text.push_str(clause);
            }
            text
        };

        let count_sql = format!("SELECT COUNT(*) FROM {}{where_sql}", descriptor.table);
        let total: i64 = self.conn.query_row(
            &count_sql,
            params_from_iter(binds.clone()),
            |row| row.get(0),
        )?;

        let mut eager: Vec<RelationSpec> = Vec::new();
        for name in &params.with_relationship {
            match descriptor.relation(name) {
                Some(relation) => eager.push(relation.clone()),
                None => {
                    return Err(RepoError::UnknownRelation {
                        table: descriptor.table.clone(),
                        relation: name.clone(),
                    });
                }
            }
        }

        let projection = match &params.select {
            None => "*".to_string(),
            Some(select) => {
                let mut fields: Vec<String> = select
                    .split(',')
                    .map(str::trim)
                    .filter(|field| !field.is_empty() && descriptor.has_column(field))
                    .map(str::to_string)
                    .collect();
                let extras = relation_locals
                    .iter()
                    .chain(eager.iter().map(|relation| &relation.local_key));
                for extra in extras {
                    if !fields.contains(extra) {
                        fields.push(extra.clone());
                    }
                }
                if fields.is_empty() {
                    "*".to_string()
                } else {
                    fields.join(", ")
                }
            }
        };

        let order_sql = match params.sort_by {
            Some(direction) if sort_column == "id" => {
                format!(" ORDER BY id {}", direction.as_sql())
            }
            Some(direction) => {
                format!(" ORDER BY {sort_column} {}, id ASC", direction.as_sql())
            }
            None => " ORDER BY id ASC".to_string(),
        };

        let per_page = normalize_limit(params.limit);
        let current_page = params.current_page();
        let offset = i64::from(current_page - 1) * i64::from(per_page);

        let sql = format!(
            "SELECT {projection} FROM {}{where_sql}{order_sql} LIMIT ? OFFSET ?",
            descriptor.table
        );
        binds.push(Value::Integer(i64::from(per_page)));
        binds.push(Value::Integer(offset));

        let mut items = self.fetch_records(&sql, binds)?;
        for relation in &eager {
            self.attach_relation(&mut items, relation)?;
        }

        debug!(
            "event=list module=repo table={} status=ok rows={} total={total} page={current_page} duration_ms={}",
            descriptor.table,
            items.len(),
            started_at.elapsed().as_millis()
        );

        Ok(Page::assemble(
            items,
            total.max(0) as u64,
            per_page,
            params,
            base_path,
        ))
    }
}
