mod runner;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = runner::run().await {
        tracing::error!("❌ Wi-Fi manager daemon failed: {}", e);
        std::process::exit(1);
    }
}
