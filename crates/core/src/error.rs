/// Result alias that carries the custom [`MixerError`] type.
pub type Result<T> = std::result::Result<T, MixerError>;

/// Direction of a device access, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    Read,
    Write,
}

impl std::fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceOp::Read => f.write_str("read"),
            DeviceOp::Write => f.write_str("write"),
        }
    }
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// Free-form failure with a readable message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A mixer snapshot could not be parsed.
    #[error("invalid mixer snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading or writing a single control failed. Interactive callers treat
    /// this as recoverable.
    #[error("mixer {op} of control {index} failed: {reason}")]
    Device {
        op: DeviceOp,
        index: usize,
        reason: String,
    },
    /// The value handed to or returned by the device has the wrong shape for
    /// the control.
    #[error("control {index}: expected {expected} value")]
    TypeMismatch { index: usize, expected: &'static str },
    /// The requested device kind is not available on this platform.
    #[error("{0}")]
    Unsupported(String),
}

impl MixerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn device(op: DeviceOp, index: usize, reason: impl std::fmt::Display) -> Self {
        Self::Device {
            op,
            index,
            reason: reason.to_string(),
        }
    }
}
