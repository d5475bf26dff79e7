//! Environment-backed configuration. Loaded once at startup; nothing
//! reads the environment after [`Config::from_env`] returns.

/// Connection strings and tunables read from the process environment.
/// `.env` is loaded first via `dotenvy` so local development doesn't
/// need the variables exported in the shell.
///
/// The event store and the read model are addressed by two separate
/// connection strings, since nothing about this system requires them to
/// live in the same database. `READ_MODEL_DATABASE_URL` defaults to
/// `EVENT_STORE_DATABASE_URL` for the common single-instance deployment.
pub struct Config {
    pub event_store_url: String,
    pub read_model_url: String,
    pub projector_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let event_store_url = std::env::var("EVENT_STORE_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("EVENT_STORE_DATABASE_URL (or DATABASE_URL) must be set");
        let read_model_url = std::env::var("READ_MODEL_DATABASE_URL")
            .unwrap_or_else(|_| event_store_url.clone());
        Self {
            event_store_url,
            read_model_url,
            projector_name: std::env::var("PROJECTOR_NAME")
                .unwrap_or_else(|_| "account_balance_projector_v1".to_string()),
        }
    }
}
