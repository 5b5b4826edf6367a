//! # cadence-store
//!
//! SQLite persistence for the Cadence engine.
//!
//! Repositories are stateless — all methods take a `&rusqlite::Connection`
//! and translate between Rust types and SQL. Mutations that participate in
//! the engine's concurrency model use conditional writes:
//!
//! - [`PatternRepository::advance`](patterns::PatternRepository::advance)
//!   only moves `last_generated` forward if the stored value still matches
//!   what the caller read (compare-and-swap per due date).
//! - [`ProgressionRepository::update`](progression::ProgressionRepository::update)
//!   is gated on a `version` column that every write bumps.

#![deny(unsafe_code)]

pub mod patterns;
pub mod progression;
pub mod schema;
pub mod tasks;
pub mod types;
