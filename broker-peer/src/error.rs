use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),
    #[error("codec error: {0}")]
    Codec(#[from] broker_proto::CodecError),
}
