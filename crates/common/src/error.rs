//! Error types shared across Stopmo crates.

/// Top-level error type for Stopmo operations.
#[derive(Debug, thiserror::Error)]
pub enum StopmoError {
    #[error("Failed to decode {source_label}: {message}")]
    Decode {
        source_label: String,
        message: String,
    },

    #[error("Index {index} out of range for {len} frames")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Encoder unavailable: {message}")]
    EncoderUnavailable { message: String },

    #[error("Encoder error: {message}")]
    Encoder { message: String },

    #[error("Operation rejected: {message}")]
    ReentrantOperation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using StopmoError.
pub type StopmoResult<T> = Result<T, StopmoError>;

impl StopmoError {
    pub fn decode(source_label: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            source_label: source_label.into(),
            message: msg.into(),
        }
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    pub fn reentrant(msg: impl Into<String>) -> Self {
        Self::ReentrantOperation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error is a silently-rejected state machine request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ReentrantOperation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_message() {
        let err = StopmoError::index_out_of_range(4, 3);
        assert_eq!(err.to_string(), "Index 4 out of range for 3 frames");
    }

    #[test]
    fn test_rejection_classification() {
        assert!(StopmoError::reentrant("export running").is_rejection());
        assert!(!StopmoError::encoder_unavailable("no ffmpeg").is_rejection());
    }
}
