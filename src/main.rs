use proudme_feedback::config::Config;
use proudme_feedback::feedback::FeedbackEngine;
use proudme_feedback::middleware::RateLimiter;
use proudme_feedback::services::generation::OpenAiGenerator;
use proudme_feedback::state::{AppState, SharedState};
use proudme_feedback::web;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {:#}", e);
        e
    })?;
    tracing::info!(
        model = %config.openai.model,
        timeout_ms = config.engine.generation_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let generator = Arc::new(OpenAiGenerator::new(config.openai.clone()));
    let engine = FeedbackEngine::new(generator, config.engine.clone());
    let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window_secs)
        .trust_forwarded(config.trust_forwarded_for);

    let shared: SharedState = Arc::new(AppState {
        engine,
        limiter: limiter.clone(),
    });

    let window = Duration::from_secs(config.rate_limit_window_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window);
        loop {
            ticker.tick().await;
            limiter.cleanup().await;
        }
    });

    let app = web::routes(shared).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
