use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use crate::config::{AppConfig, initialize_app_state};
use crate::router::create_router;

/// Bind `bind_address` and serve `app` until the process is stopped.
pub async fn run_server(app: Router, bind_address: &str) -> Result<()> {
    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Foodgram API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    trace!("Starting axum server");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}

pub async fn serve(config: AppConfig) -> Result<()> {
    info!("Foodgram application starting up");
    debug!("Database URL: {}", config.database_url);

    let state = initialize_app_state(&config)
        .await
        .inspect_err(|e| error!("Failed to initialize application state: {:#}", e))?;
    debug!("Application state initialized successfully");

    run_server(create_router(state), &config.bind_address).await
}
