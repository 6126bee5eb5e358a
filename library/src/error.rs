use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("No converter from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
    #[error("Parse error (line {line}): {message}")]
    Parse { line: usize, message: String },
    #[error("No field or output \"{name}\" in \"{container}\"")]
    NoSuchField { container: String, name: String },
    #[error("Unknown container: {0}")]
    UnknownContainer(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FieldError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        FieldError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FieldError::InvalidArgument(message.into())
    }

    /// True for errors caused by malformed serialized input.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            FieldError::Parse { .. } | FieldError::NoSuchField { .. } | FieldError::UnknownContainer(_)
        )
    }
}
