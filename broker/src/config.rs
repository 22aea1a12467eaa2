use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// The four bind addresses plus the knobs that shape how fast each plane notices a shutdown
/// signal and how chatty logging is. Layered config: defaults, then an optional TOML file, then
/// `BROKER_`-prefixed environment variables, then CLI flags — each layer overrides the last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub request_address: String,
    pub service_address: String,
    pub submit_values_address: String,
    pub new_values_address: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// CLI surface; every field is optional here so that an unset flag falls through to the file or
/// environment layer instead of clobbering it with `None`.
#[derive(Debug, Parser)]
#[command(name = "broker", about = "Rendezvous message broker")]
pub struct Cli {
    /// Path to a TOML config file. Missing is not an error — CLI flags and environment
    /// variables alone are enough to run the broker.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long)]
    pub request_address: Option<String>,

    #[arg(long)]
    pub service_address: Option<String>,

    #[arg(long)]
    pub submit_values_address: Option<String>,

    #[arg(long)]
    pub new_values_address: Option<String>,

    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    #[arg(long)]
    pub log_filter: Option<String>,
}

impl BrokerConfig {
    pub fn load(cli: &Cli) -> Result<Self, BrokerError> {
        let mut builder = Config::builder()
            .set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)?
            .set_default("log_filter", "info")?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("BROKER"));

        if let Some(value) = &cli.request_address {
            builder = builder.set_override("request_address", value.clone())?;
        }
        if let Some(value) = &cli.service_address {
            builder = builder.set_override("service_address", value.clone())?;
        }
        if let Some(value) = &cli.submit_values_address {
            builder = builder.set_override("submit_values_address", value.clone())?;
        }
        if let Some(value) = &cli.new_values_address {
            builder = builder.set_override("new_values_address", value.clone())?;
        }
        if let Some(value) = cli.poll_interval_ms {
            builder = builder.set_override("poll_interval_ms", value as i64)?;
        }
        if let Some(value) = &cli.log_filter {
            builder = builder.set_override("log_filter", value.clone())?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}
