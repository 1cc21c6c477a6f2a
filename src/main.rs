use peoples_voice::config::AppConfig;
use peoples_voice::middleware::rate_limit::RateLimiter;
use peoples_voice::realtime::{self, ChangeFeed};
use peoples_voice::responder::{HttpResponder, KeywordResponder, Responder};
use peoples_voice::store::PgStore;
use peoples_voice::{build_router, db, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;
    if config.uses_default_secret() {
        tracing::warn!("Using the default JWT secret. Set JWT_SECRET before deploying.");
    }

    let db_pool = db::create_pool(&config).await?;
    let backend = Arc::new(PgStore::new(db_pool.clone()));

    let responder: Arc<dyn Responder> = match &config.responder_url {
        Some(url) => {
            tracing::info!("Forwarding prompts to responder at {}", url);
            Arc::new(HttpResponder::new(url.clone())?)
        }
        None => {
            tracing::info!(
                "RESPONDER_URL not set. Using keyword responder ({} ms delay).",
                config.response_delay.as_millis()
            );
            Arc::new(KeywordResponder::new(config.response_delay))
        }
    };

    // Session change notifications from the database trigger
    let changes = ChangeFeed::new();
    tokio::spawn(realtime::listen_postgres(db_pool, changes.clone()));

    let bind_addr = config.bind_addr;
    let shared_state = Arc::new(AppState {
        store: backend.clone(),
        accounts: backend,
        responder,
        changes,
        auth_limiter: RateLimiter::strict(),
        config,
    });

    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,peoples_voice=trace,sqlx=info,hyper=info,tower=info".to_string()
        } else {
            "info,peoples_voice=info,sqlx=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🗣️ People's Voice starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
