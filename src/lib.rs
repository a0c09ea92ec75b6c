//! Event participation platform with a request lifecycle engine and a hit statistics service.
//!
//! Users request to join published events; organizers confirm or reject those requests
//! against the event's participant limit. The [`ParticipationService`] enforces the
//! request state machine on top of any [`Storage`] implementation, and the stats
//! service records and aggregates views of public endpoints.

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod manager;
pub mod participation;
pub mod stats;
pub mod telemetry;

// Re-export commonly used types
pub use catalog::CatalogService;
pub use config::ServiceConfig;
pub use domain::*;
pub use error::{ErrorKind, Result, TurnoutError};
pub use http::{MockStatsClient, ReqwestStatsClient, StatsClient};
pub use manager::Storage;
pub use manager::memory::InMemoryStorage;
#[cfg(feature = "postgres")]
pub use manager::postgres::{PoolProvider, PostgresStorage, TestDbPools, create_pool};
pub use participation::{Decision, ParticipationService, StatusUpdate, StatusUpdateResult};
pub use stats::{Hit, StatsStorage, ViewStats};

/// Get the turnout database migrator
///
/// Returns a migrator that can be run against a connection pool.
#[cfg(feature = "postgres")]
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}
