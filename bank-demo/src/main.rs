//! Wiring demo: opens an account, deposits and withdraws against it,
//! runs the projector for a moment, and prints the resulting read-model
//! row. Not a server — just enough to exercise the whole stack end to
//! end against a real Postgres instance.

use bank_domain::money::Money;
use bank_domain::read_model::ReadModelStore;
use bank_infra::{AccountService, Config, PgEventStore, PgReadModelStore, Projector};
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = bank_infra::telemetry::get_subscriber("info");
    bank_infra::telemetry::init_subscriber(subscriber);

    let config = Config::from_env();
    let event_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.event_store_url)
        .await?;
    let read_model_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.read_model_url)
        .await?;
    bank_infra::run_migrations(&event_pool).await?;
    bank_infra::run_migrations(&read_model_pool).await?;

    let store = Arc::new(PgEventStore::new(event_pool.clone()));
    let read_model = Arc::new(PgReadModelStore::new(read_model_pool.clone()));
    let repository = Arc::new(bank_domain::repository::EventSourcedRepository::new(
        store.clone(),
    ));
    let service = AccountService::new(repository, read_model.clone());

    let projector = Arc::new(Projector::new(
        config.projector_name.clone(),
        store.clone(),
        read_model.clone(),
        read_model_pool.clone(),
    ));
    let projector_handle = projector.start();

    let usd: bank_domain::money::CurrencyCode = "USD".parse().unwrap();
    let account_id = service
        .open_account("Ada Lovelace".to_string(), dec!(0), Money::zero(usd))
        .await?;
    info!(%account_id, "opened account");

    service
        .deposit(account_id, Money::new(dec!(500), usd))
        .await?;
    service
        .withdraw(account_id, Money::new(dec!(125), usd))
        .await?;

    tokio::time::sleep(Duration::from_millis(600)).await;

    let row = read_model.get_balance(account_id).await?;
    info!(?row, "projected account balance");

    projector_handle.shutdown();
    projector_handle.join().await;
    Ok(())
}
