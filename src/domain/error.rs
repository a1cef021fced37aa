use thiserror::Error;

/// Top-level error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] crate::decoder::DecodeError),

    #[error("Frame error: {0}")]
    Frame(#[from] crate::frame::FrameError),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),

    #[error("Sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    #[error("Service error: {0}")]
    Service(#[from] crate::app::ServiceError),
}
