use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),
    #[error("codec error: {0}")]
    Codec(#[from] broker_proto::CodecError),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
    #[error("plane thread '{0}' panicked")]
    PlanePanicked(&'static str),
}
