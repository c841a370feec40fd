use std::env;

use judge_mock::MockServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = env::var("JUDGE_MOCK_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    tracing::info!("Starting judge mock on {addr}");

    MockServer::new().serve(&addr).await
}
