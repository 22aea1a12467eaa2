use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    MessageFormat(#[from] serde_json::Error),
    #[error("router envelope has no empty delimiter frame")]
    MissingEnvelopeDelimiter,
}
