//! Typed list-query specification and paginated result shaping.
//!
//! # Responsibility
//! - Model the caller-facing list parameters as a validated, typed struct.
//! - Shape paginated results with totals and navigation links.
//!
//! # Invariants
//! - Identical parameters produce identical link strings (determinism).
//! - Parameter echoes in links are percent-encoded.

pub mod page;
pub mod params;
