//! Error type for `folk-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identity store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The offloaded duplicate scan aborted (panicked or was torn down).
  #[error("duplicate scan aborted: {0}")]
  ScanAborted(String),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
