use thiserror::Error;

/// Failure modes of a single gateway call.
///
/// `RateLimited` and `Transport` are retryable by the caller; `Gateway`
/// generally is not without a change to the request. No retries happen
/// inside this crate.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limit hit, please wait {wait} (wait {wait_secs}s) before trying again")]
    RateLimited { wait: String, wait_secs: u64 },

    #[error("model host returned status {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("transport failure talking to model host: {0}")]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}
