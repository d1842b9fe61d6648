//! Entity descriptors and live-schema reflection.
//!
//! # Responsibility
//! - Declare per-entity column and relation registries.
//! - Reflect column listings from the live SQLite schema.
//!
//! # Invariants
//! - Every identifier interpolated into repository SQL must come from a
//!   descriptor that was validated against the live schema.

pub mod descriptor;
