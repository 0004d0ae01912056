//! Error type for projection and output.

use std::fmt;

/// Errors raised while selecting columns or writing output.
#[derive(Debug)]
pub enum RenderError {
    /// None of the requested `-c` columns exist.
    UnknownColumns {
        requested: Vec<String>,
        available: Vec<String>,
    },

    /// The output format cannot represent this kind of result.
    UnsupportedFormat { format: String, shape: &'static str },

    /// Structured serialization failed.
    Serialization(String),

    /// Writing to the output stream failed.
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownColumns {
                requested,
                available,
            } => write!(
                f,
                "No recognized column names in {:?}. Recognized columns are {:?}.",
                requested, available
            ),
            RenderError::UnsupportedFormat { format, shape } => write!(
                f,
                "format '{}' is not available for {} output",
                format, shape
            ),
            RenderError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            RenderError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for RenderError {
    fn from(err: csv::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for RenderError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for RenderError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_columns_display() {
        let err = RenderError::UnknownColumns {
            requested: vec!["Colour".into()],
            available: vec!["ID".into(), "Name".into()],
        };
        let text = err.to_string();
        assert!(text.contains("\"Colour\""));
        assert!(text.contains("\"ID\", \"Name\""));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: RenderError = io_err.into();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
