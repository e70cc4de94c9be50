use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let lag_reads = std::env::var("MOCK_LAG_READS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    let config = MockConfig { lag_reads, ..MockConfig::default() };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, lag_reads, "mock Jamf Pro listening");
    mock_server::run_with(listener, config).await
}
