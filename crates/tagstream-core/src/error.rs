//! Error types for TagStream

/// Result type alias using TagStream's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for TagStream operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport collaborator did not supply a readable body
    #[error("no readable stream was supplied")]
    MissingSource,

    /// A single frame could not be decoded (never aborts a stream)
    #[error("frame error: {0}")]
    Frame(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Marker pattern compilation errors
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Create a new frame error
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::MissingSource.to_string(),
            "no readable stream was supplied"
        );
        assert_eq!(
            Error::config("empty marker").to_string(),
            "configuration error: empty marker"
        );
    }

    #[test]
    fn test_from_conversions() {
        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(Error::from(json), Error::Serialization(_)));

        let pattern = regex::Regex::new("(").unwrap_err();
        assert!(matches!(Error::from(pattern), Error::Pattern(_)));
    }
}
