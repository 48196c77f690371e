//! treestage HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (port 5000, default DB path)
//! cargo run --bin treestage-server
//!
//! # Custom port and database
//! TREESTAGE_PORT=5001 TREESTAGE_DB_PATH=/tmp/tree.db cargo run --bin treestage-server
//! ```
//!
//! # Environment Variables
//!
//! - `TREESTAGE_PORT`: Server port (default: 5000)
//! - `TREESTAGE_DB_PATH`: Database file (default: ~/.treestage/database/treestage.db)
//! - `TREESTAGE_CORS_ORIGINS`: Comma separated allowed origins (default: http://localhost:4200)
//! - `TREESTAGE_CASCADE_BATCH_SIZE`: Children flagged per cascade page (default: 64)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use treestage_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("treestage server");

    let config = ServerConfig::from_env()?;
    tracing::info!("Port: {}", config.port);
    tracing::info!("Database: {}", config.db_path.display());

    treestage_server::start_server(config).await
}
