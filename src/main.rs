use clap::Parser;
use dotenvy::dotenv;
use rust_cipher_backend::config::AppConfig;
use rust_cipher_backend::services::blob_store::BlobStore;
use rust_cipher_backend::services::exchange::ExchangeService;
use rust_cipher_backend::services::processor;
use rust_cipher_backend::services::reaper::Reaper;
use rust_cipher_backend::services::token_store::TokenStore;
use rust_cipher_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run (api, reaper, all)
    #[arg(short, long, default_value = "all")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_cipher_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Rust Cipher Backend [Mode: {}]...", args.mode);

    let config = AppConfig::from_env();
    info!(
        "🔐 Config: TTL={}h, Sweep={}s, Max Size={}MB, Accepted={}",
        config.token_ttl_hours,
        config.reaper_interval_secs,
        config.max_file_size / 1024 / 1024,
        config.accepted_extension
    );

    let tokens = Arc::new(TokenStore::new(
        BlobStore::new(config.storage_root.clone()),
        chrono::Duration::hours(config.token_ttl_hours),
    ));
    let transformer = processor::setup_transformer(&config);
    let exchange = Arc::new(ExchangeService::new(
        tokens.clone(),
        transformer,
        config.clone(),
    ));

    // Setup Graceful Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut handles = Vec::new();

    if args.mode == "reaper" || args.mode == "all" {
        let reaper = Reaper::new(
            tokens.clone(),
            std::time::Duration::from_secs(config.reaper_interval_secs),
            shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(async move {
            reaper.run().await;
        }));
        info!("🧹 Reaper service initialized.");
    }

    if args.mode == "api" || args.mode == "all" {
        let state = AppState {
            tokens: tokens.clone(),
            exchange,
            config: config.clone(),
        };

        let app = create_app(state)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    })
                    .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                        info!("📥 {} {}", request.method(), request.uri());
                    })
                    .on_response(
                        |response: &axum::http::Response<_>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            info!(
                                "📤 Finished in {:?} with status {}",
                                latency,
                                response.status()
                            );
                        },
                    ),
            )
            .layer(axum::extract::DefaultBodyLimit::max(config.max_file_size));

        let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("✅ Server ready at http://{}", addr);
        info!("📖 Swagger UI: http://{}/swagger-ui", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            })
            .await?;
    } else {
        // Reaper-only mode still honors ctrl-c/SIGTERM
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    }

    for handle in handles {
        let _ = handle.await;
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
