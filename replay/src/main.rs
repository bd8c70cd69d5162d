//! Bough Replay - replays a recorded bookmark feed against a store snapshot.

use bough_replay::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bough_engine=debug,bough_replay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Replaying {} against {}",
        config.records_path.display(),
        config.store_path.display()
    );

    let summary = bough_replay::run(&config).await?;

    if summary.pending_orphans > 0 || summary.failed > 0 {
        tracing::warn!(
            pending = summary.pending_orphans,
            failed = summary.failed,
            "Session finished with leftovers"
        );
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
