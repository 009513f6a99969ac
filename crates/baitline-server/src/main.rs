//! Baitline Server
//!
//! Phishing-awareness training backend:
//! - Event tracking and aggregation (`/api/track-event`)
//! - Free-form data collection (`/api/collect-data`)
//! - Health, readiness and Prometheus metrics
//! - `simulate` command that replays a scripted visit against a running server

use baitline_ingress::IngressState;
use baitline_observability::Metrics;
use baitline_server::{LogFormat, LoggingConfig, ServerConfig, build_app};
use baitline_tracker::{
    HttpSink, HttpSinkConfig, PageContext, Tracker, TrackerPolicy, run_scenario,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const HOOK: &str = r#"
        |
        |     _           _ _   _ _
        |    | |__   __ _(_) |_| (_)_ __   ___
        J    | '_ \ / _` | | __| | | '_ \ / _ \
   ___.-'    | |_) | (_| | | |_| | | | | |  __/
  (____)     |_.__/ \__,_|_|\__|_|_|_| |_|\___|
                  phishing awareness simulator
"#;

/// Baitline Server - phishing simulation tracking backend
#[derive(Parser)]
#[command(name = "baitline-server")]
#[command(about = "Tracking backend for phishing-awareness training", long_about = None)]
#[command(before_help = HOOK)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "BAITLINE_CONFIG",
        global = true
    )]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,
    /// Replay scripted page visits against a running server
    Simulate {
        /// Base URL of the server to send events to
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        target: String,

        /// Number of visits to simulate
        #[arg(long, default_value = "1")]
        visits: u32,

        /// URL reported as the visited page
        #[arg(long, default_value = "http://localhost:3000/")]
        page_url: String,

        /// Fixed session id; each visit gets its own when omitted
        #[arg(long)]
        session_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        ServerConfig::from_file(config_path)?
    } else {
        ServerConfig::default()
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    init_tracing(&config.logging)?;

    match cli.command {
        Some(Commands::Simulate {
            target,
            visits,
            page_url,
            session_id,
        }) => simulate(&target, visits, &page_url, session_id).await,
        Some(Commands::Serve) | None => serve(config, cli.config.as_deref()).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|e| {
        eprintln!(
            "Warning: Invalid log level '{}' ({}), using info",
            logging.level, e
        );
        EnvFilter::new("info")
    });

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

async fn serve(
    config: ServerConfig,
    config_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", HOOK);

    match config_path {
        Some(path) => info!("📁 Loaded configuration from: {}", path),
        None => info!("📁 Using default configuration"),
    }

    let metrics = Arc::new(Metrics::new()?);
    let app = build_app(&config, IngressState::in_memory(), metrics);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("");
    info!("✅ Baitline listening on http://{}", addr);
    info!("   API endpoints:");
    info!("   - Track event:        http://{}/api/track-event", addr);
    info!("   - Collect data:       http://{}/api/collect-data", addr);
    info!("   Observability:");
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);
    info!("");
    warn!("⚠️  GET /api/track-event and GET /api/collect-data return all stored data without authentication");
    warn!("⚠️  Records are held in memory only and are lost on restart");
    if config.http.cors_enabled {
        info!("🌐 CORS enabled for all origins");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn simulate(
    target: &str,
    visits: u32,
    page_url: &str,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = target.trim_end_matches('/');
    let policy = TrackerPolicy::default();
    // Long enough for every debounced burst to fire
    let settle = policy.mouse_debounce.max(policy.scroll_debounce) + Duration::from_millis(250);

    for visit in 1..=visits {
        let session = session_id
            .clone()
            .unwrap_or_else(|| format!("simulated-{}-{}", std::process::id(), visit));

        let sink = HttpSink::new(
            HttpSinkConfig::new(format!("{}/api/track-event", base)).with_session_id(&session),
        )?;
        let page = PageContext::new(page_url)
            .with_referrer("https://mail.example.com/")
            .with_user_agent(format!("baitline-simulator/{}", env!("CARGO_PKG_VERSION")));

        info!(visit, session = %session, "Starting simulated visit");
        run_scenario(Tracker::start(Arc::new(sink), page, policy.clone()), settle).await;
    }

    let analytics: serde_json::Value = reqwest::get(format!("{}/api/track-event", base))
        .await?
        .error_for_status()?
        .json()
        .await?;

    info!(
        total_events = %analytics["totalEvents"],
        unique_sessions = %analytics["uniqueSessions"],
        event_types = %analytics["eventTypes"],
        "Simulation finished"
    );

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
