use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use match_service::{
    http::{self, AppState},
    logging,
    services::{PresenceReader, RedisPresence},
    CandidatePool, Config, FameRecalculator, PgDirectory, SuggestionService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        service = %config.service.service_name,
        environment = %config.service.environment,
        port = config.service.http_port,
        "Starting match-service"
    );

    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;

    let directory = Arc::new(PgDirectory::new(db));

    let presence: Option<Arc<dyn PresenceReader>> = match &config.presence.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            let manager = client
                .get_connection_manager()
                .await
                .context("Failed to connect to Redis")?;
            info!(key = %config.presence.online_set_key, "Reading online status from Redis");
            Some(Arc::new(RedisPresence::new(
                manager,
                config.presence.online_set_key.clone(),
            )))
        }
        None => {
            warn!("REDIS_URL not set, using stored online flags");
            None
        }
    };

    let mut suggestions = SuggestionService::new(
        CandidatePool::from_directory(directory.clone()),
        config.browse.store_timeout(),
    );
    if let Some(presence) = presence {
        suggestions = suggestions.with_presence(presence);
    }

    let state = web::Data::new(AppState {
        suggestions,
        fame: FameRecalculator::new(directory),
        browse: config.browse.clone(),
    });

    let bind_addr = (config.service.host.clone(), config.service.http_port);
    info!("HTTP server listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(http::configure)
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
