use broker::config::{BrokerConfig, Cli};
use broker::runtime;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BrokerConfig::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    runtime::run(config)?;
    Ok(())
}
