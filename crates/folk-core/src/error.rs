//! Error types for `folk-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The string carried the person scheme prefix but no parseable integer.
  #[error("malformed person uri: {0:?}")]
  InvalidPersonUri(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
