//! # cadence-core
//!
//! Shared foundation for the Cadence recurring-task and progression engine:
//!
//! - [`errors`]: The [`CadenceError`](errors::CadenceError) taxonomy
//! - [`ids`]: Prefixed UUID v7 ID generation and timestamp helpers
//! - [`events`]: Domain events and the [`NotificationSink`](events::NotificationSink) trait
//! - [`config`]: Immutable engine configuration ([`PointsConfig`](config::PointsConfig))

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod events;
pub mod ids;
