//! Postgres-backed infrastructure implementing the `bank-domain` store,
//! repository, and read-model traits, plus the projector and config/
//! logging ambient stack around them.

pub mod config;
pub mod event_store;
pub mod projector;
pub mod read_model;
pub mod service;
pub mod telemetry;

pub use config::Config;
pub use event_store::PgEventStore;
pub use projector::{Projector, ProjectorHandle};
pub use read_model::PgReadModelStore;
pub use service::AccountService;

/// Run pending migrations against `pool`. Call once at startup; safe to
/// call from multiple instances concurrently since sqlx serializes
/// migration runs with a Postgres advisory lock internally.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
