use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridge_service::config::Config;
use bridge_service::db::{
    ExampleStore, PostgresContentStore, PostgresContextSource, PostgresExampleStore,
    PostgresRecommendationStore, PostgresSettingsStore, ThresholdSource,
};
use bridge_service::handlers::{self, health::health, BridgeState};
use bridge_service::jobs;
use bridge_service::services::{
    ContentIndex, ContextService, ExampleMatcher, RecommendationService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to load configuration")?;

    info!("Starting bridge-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
    }

    let thresholds: Arc<dyn ThresholdSource> = Arc::new(PostgresSettingsStore::new(pool.clone()));
    let examples: Arc<dyn ExampleStore> = Arc::new(PostgresExampleStore::new(pool.clone()));
    let context = Arc::new(ContextService::new(
        Arc::new(PostgresContextSource::new(pool.clone())),
        &config.cache,
    ));
    let recommendations = Arc::new(RecommendationService::new(
        Arc::new(PostgresRecommendationStore::new(pool.clone())),
        context,
        config.recommendation.max_results,
    ));

    let state = web::Data::new(BridgeState {
        content: Arc::new(ContentIndex::new(
            Arc::new(PostgresContentStore::new(pool.clone())),
            thresholds.clone(),
        )),
        recommendations: recommendations.clone(),
        examples: examples.clone(),
        matcher: Arc::new(ExampleMatcher::new(examples)),
        thresholds,
    });

    if config.jobs.enabled {
        tokio::spawn(jobs::start_recommendation_cleaner(
            recommendations.clone(),
            Duration::from_secs(config.jobs.cleanup_interval_secs),
            config.recommendation.retention_days,
        ));
        tokio::spawn(jobs::start_recommendation_generator(
            recommendations.clone(),
            Duration::from_secs(config.jobs.generation_interval_secs),
            Duration::from_secs(config.jobs.generation_initial_delay_secs),
            config.recommendation.batch_size,
        ));
        info!("Background jobs started");
    } else {
        info!("Background jobs disabled by configuration");
    }

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route(
                "/metrics",
                web::get().to(bridge_service::metrics::metrics_handler),
            )
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
