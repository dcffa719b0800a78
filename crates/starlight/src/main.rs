use std::sync::Arc;

use tracing::info;

use starlight_core::{config::Config, store::Store};
use starlight_sqlite::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), starlight_core::Error> {
    starlight_core::logging::init("starlight")?;

    let cfg = Arc::new(Config::load()?);
    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&cfg.database_url).await?);
    info!(
        offerings = cfg.services.offerings.len(),
        "configuration loaded"
    );

    starlight_discord::router::run(cfg, store)
        .await
        .map_err(|e| starlight_core::Error::External(format!("discord bot failed: {e}")))?;

    Ok(())
}
