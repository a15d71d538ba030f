//! BetterRest
//!
//! Bedtime estimation backend. Collects a wake time, a desired amount of
//! sleep and a daily coffee intake, asks a pre-trained sleep regression how
//! much sleep is really needed, and answers with the bedtime.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod bedtime;
mod config;
mod error;
mod estimator;
mod form;
mod handlers;
mod models;
mod state;
mod validation;
mod websocket;

use crate::config::Settings;
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,betterrest=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();

    // Load configuration
    let settings = Settings::from_env().expect("Failed to load configuration");
    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);

    info!("Starting BetterRest backend");
    info!("Binding server to {}", bind_address);

    // Shared application state
    let estimator = estimator::from_model_path(settings.model.path.as_deref());
    let app_state = Arc::new(RwLock::new(AppState::new(
        estimator,
        settings.display.clock_format,
    )));

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
