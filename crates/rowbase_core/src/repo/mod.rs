//! Generic repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the entity-agnostic persistence contract.
//! - Keep all dynamic SQL assembly inside the repository boundary.
//!
//! # Invariants
//! - Every identifier interpolated into SQL is validated against the
//!   entity descriptor (and therefore against the live schema).
//! - Unknown filter/sort/select names are dropped silently; direct-column
//!   APIs reject unknown columns with semantic errors instead.

pub mod generic;
pub mod slug;
