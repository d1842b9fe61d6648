//! Dynamic entity records shared by all repository operations.
//!
//! # Responsibility
//! - Define the column-map record shape returned by generic queries.
//! - Keep value access ergonomic without per-entity structs.
//!
//! # Invariants
//! - A record's columns mirror the projection of the query that produced it.
//! - Eager-loaded relations live beside column values, never inside them.

pub mod record;
