//! # cadence-recurrence
//!
//! Recurring-task generation for the Cadence engine.
//!
//! [`engine::RecurrenceEngine`] materializes task occurrences from active
//! recurrence patterns. A tick catches up on every due date missed since
//! `last_generated`, so downtime never silently drops occurrences, and the
//! conditional advance on `last_generated` keeps concurrent schedulers
//! from double-generating.
//!
//! [`scheduler::run_scheduler`] drives ticks on a fixed cadence with
//! cooperative cancellation.

#![deny(unsafe_code)]

pub mod engine;
pub mod scheduler;
