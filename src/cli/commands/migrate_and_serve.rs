use anyhow::Result;
use tracing::{debug, info};

use super::initdb::connect_and_migrate;
use super::serve::run_server;
use crate::config::{AppConfig, build_app_state};
use crate::router::create_router;

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", config.database_url);

    let db = connect_and_migrate(&config.database_url).await?;
    let state = build_app_state(db, &config);

    run_server(create_router(state), &config.bind_address).await
}
