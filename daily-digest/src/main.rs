use anyhow::Result;
use tracing::{info, Level};

mod pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real deployments set the variables directly.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🚀 Starting the arXiv daily digest");

    let config = common::AppConfig::load()?;
    pipeline::run(&config).await
}
