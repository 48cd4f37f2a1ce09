//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configuration file given explicitly doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A configuration file's extension isn't one of `toml`, `yaml`, `yml`
    /// or `json`.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A value is missing, malformed, or out of range.
    #[display("invalid configuration value for {key}: {message}")]
    Invalid {
        #[error(not(source))]
        key: String,
        #[error(not(source))]
        message: String,
    },
    #[display("no collection named {_0:?} is configured")]
    UnknownCollection(#[error(not(source))] String),
}
impl ErrorKind {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
impl From<figment::Error> for ErrorKind {
    fn from(error: figment::Error) -> Self {
        let key = match error.path.is_empty() {
            true => "(root)".to_string(),
            false => error.path.join("."),
        };
        Self::invalid(key, error.kind.to_string())
    }
}
