use serde::Serialize;

/// Rejection of malformed numeric input by the analytics core.
///
/// Missing data is not an error: those operations return `Ok(None)`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

impl AnalysisError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    AnalysisError::InvalidInput(msg.into())
  }
}

impl Serialize for AnalysisError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
