use thiserror::Error;

/// Main error type for kiosk operations
#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Timeout during {0}")]
    DeviceTimeout(String),

    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Result type alias for kiosk operations
pub type KioskResult<T> = Result<T, KioskError>;
