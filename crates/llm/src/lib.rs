pub mod client;
pub mod error;
pub mod ratelimit;

pub use client::{
    ChatMessage, Completion, CompletionOptions, DEFAULT_ENDPOINT, DEFAULT_MODEL, LlmClient,
    LlmConfig, REQUEST_TIMEOUT_SECS,
};
pub use error::LlmError;
pub use ratelimit::{RateLimitSnapshot, RateLimitStore, format_wait};
