//! The rendezvous broker: request/reply routing between named peers plus publish/subscribe
//! fan-out, composed from three concurrent plane threads.

pub mod config;
mod error;
mod interplane;
mod publish_plane;
mod registry;
mod request_plane;
mod service_plane;
mod shutdown;

pub mod runtime;

pub use config::{BrokerConfig, Cli};
pub use error::BrokerError;
pub use shutdown::{Shutdown, ShutdownSignal};
