use anyhow::Result;
use std::sync::Arc;
use testacme::{Config, DefaultA, Dns, PortAllocator, RecordStore, SharedConfig};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let config = config_init(std::env::args().nth(1))?;
    let store = Arc::new(RecordStore::new(DefaultA::new(
        config.dns.default_a,
        config.dns.default_ttl,
    )));

    let dns = Dns::new(&config.dns, store).await?;
    tracing::info!("DNS listening on {} {}", dns.network(), dns.addr());

    let allocator = PortAllocator::new(&config.ports);
    let (http_port, tls_port) = allocator.allocate_pair().await?;
    tracing::info!("HTTP verification port {http_port}");
    tracing::info!("TLS verification port {tls_port}");

    signal::ctrl_c().await?;
    tracing::info!("quitting from signal");
    dns.shutdown();
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testacme=info".into()),
        )
        .init();
}

fn config_init(config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => {
            tracing::debug!("no config file given, using defaults");
            Ok(Arc::new(Config::default()))
        }
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}
