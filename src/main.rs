//! crop-advisor - crop and fertilizer recommendation service
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default address with a sled store under ./data
//! cargo run --release
//!
//! # Use a trained model artifact and the remote sensor table
//! ./crop-advisor --model model/knn.json --store rest
//!
//! # Validate a config file without starting the server
//! ./crop-advisor --config crop_advisor.toml check-config
//!
//! # One-off dosage calculation
//! ./crop-advisor recommend --crop maize 100 20 50
//! ```
//!
//! # Environment Variables
//!
//! - `CROP_ADVISOR_CONFIG`: Path to the TOML config file
//! - `CROP_ADVISOR_SERVER_ADDR`, `CROP_ADVISOR_CORS_ORIGINS`, `CROP_ADVISOR_MODEL_PATH`
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY`: remote sensor store credentials
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crop_advisor::api::{create_app, AppState};
use crop_advisor::config::validation::ValidationWarning;
use crop_advisor::config::{AdvisorConfig, StoreBackend};
use crop_advisor::{load_classifier, open_store, DosageEngine, NutrientReading};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crop-advisor")]
#[command(about = "Crop and fertilizer recommendations from soil NPK readings")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5000")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Path to the TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to a JSON k-NN model artifact
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Sensor store backend
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// Directory for the embedded sensor store
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Load and validate the configuration, then exit
    CheckConfig,

    /// Compute a fertilizer recommendation for one reading and print it as JSON
    Recommend {
        /// Crop identifier, e.g. "maize"
        #[arg(long)]
        crop: String,
        /// Nitrogen reading
        #[arg(allow_negative_numbers = true)]
        n: f64,
        /// Phosphorus reading
        #[arg(allow_negative_numbers = true)]
        p: f64,
        /// Potassium reading
        #[arg(allow_negative_numbers = true)]
        k: f64,
    },
}

// ============================================================================
// Start-up helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// File, then environment, then command line. Validated once, at the end,
/// and the range warnings from that pass are handed back.
fn resolve_config(args: &CliArgs) -> Result<(AdvisorConfig, Vec<ValidationWarning>)> {
    let mut config =
        AdvisorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env_overrides();

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(model) = &args.model {
        config.model.path = Some(model.clone());
    }
    if let Some(store) = args.store {
        config.storage.backend = store;
    }
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir.clone_from(dir);
    }

    let warnings = config.validate().context("Invalid configuration")?;
    Ok((config, warnings))
}

fn check_config(config: &AdvisorConfig, warnings: &[ValidationWarning]) -> Result<()> {
    for w in warnings {
        println!("warning: {w}");
    }
    println!(
        "Configuration OK: {} crop target(s), store backend {:?}, listening on {}",
        config.crop_targets.len(),
        config.storage.backend,
        config.server.addr
    );
    Ok(())
}

fn recommend_once(config: &AdvisorConfig, crop: &str, raw: [f64; 3]) -> Result<()> {
    let engine = DosageEngine::from_config(config);
    let reading = NutrientReading::from_raw(raw);
    let recommendation = engine.recommend(crop, reading);
    if recommendation.is_none() {
        warn!(crop, "No fertilizer guidance available for this crop");
    }
    let json = serde_json::to_string_pretty(&recommendation)
        .context("Failed to serialize recommendation")?;
    println!("{json}");
    Ok(())
}

async fn serve(config: AdvisorConfig, cancel_token: CancellationToken) -> Result<()> {
    let engine = Arc::new(DosageEngine::from_config(&config));
    let classifier = load_classifier(&config.model, engine.targets())
        .context("Failed to load crop classifier")?;
    let store = open_store(&config.storage).context("Failed to open sensor store")?;

    info!(
        classifier = classifier.name(),
        store = store.backend_name(),
        crops = engine.targets().len(),
        "Components ready"
    );

    let state = AppState::new(engine, classifier, store);
    let app = create_app(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("HTTP server listening on {}", config.server.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await
        .context("HTTP server error")?;

    info!("[HttpServer] Graceful shutdown complete");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win.
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let (config, warnings) = resolve_config(&args)?;

    if let Some(SubCommand::CheckConfig) = &args.command {
        return check_config(&config, &warnings);
    }
    for w in &warnings {
        warn!("{}", w);
    }

    if let Some(SubCommand::Recommend { crop, n, p, k }) = &args.command {
        return recommend_once(&config, crop, [*n, *p, *k]);
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    serve(config, cancel_token).await?;

    info!("crop-advisor shutdown complete");
    Ok(())
}
