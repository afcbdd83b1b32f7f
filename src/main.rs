//! Guild Governance - data directory bootstrap
//!
//! Loads configuration, prepares every collection file in the data directory
//! and reports what is stored. The platform gateway that feeds the
//! dispatcher runs elsewhere.

use guild_governance::config::{LogFormat, LoggingConfig, Settings};
use guild_governance::state::AppState;
use guild_governance::store::Collection;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize tracing subscriber for structured logging
    init_tracing(&settings.logging);

    info!("🚀 Starting Guild Governance core...");
    info!("📋 Configuration loaded successfully");

    let state = AppState::open_json(&settings.storage).await?;
    info!("✅ Data directory ready at {}", settings.storage.data_dir.display());

    for collection in Collection::ALL {
        let count = state.store.get_all(collection).await.len();
        info!("   {:<20} {:>6} documents", collection.to_string(), count);
    }

    info!(
        "Next proposal id: {}, next court id: {}",
        state.repositories.messages.next_proposal_id().await,
        state.repositories.court.next_court_id().await
    );

    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init(),
    }
}
