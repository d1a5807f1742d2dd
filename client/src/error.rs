use shared::schema::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Server version {got} is not supported (expected {expected})")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("Not connected")]
    NotConnected,
}
