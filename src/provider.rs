use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call failed: {0}")]
    Call(String),
    #[error("provider timed out")]
    Timeout,
    #[error("no reasoning provider configured")]
    Unavailable,
}

/// Capability interface for the external language-reasoning service. The core
/// must function with zero providers configured; every caller has a
/// deterministic fallback path.
///
/// Implementations own their transport and are expected to bound the call
/// with a timeout.
pub trait ReasoningProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
