//! Gemini integration module.
//!
//! Scripts are generated and translated by Google's Gemini `generateContent`
//! API, asked to answer with JSON matching the [`Script`](crate::script::Script)
//! shape. The controller only sees the [`ScriptGenerator`] trait.

mod client;
mod generator;
pub mod prompt;
mod retry;

pub use client::{
    validate_topic, GeminiClient, GenError, DEFAULT_MODEL, DEFAULT_TIMEOUT, GEMINI_API_BASE_URL,
    GEMINI_API_KEY_ENV,
};
pub use generator::ScriptGenerator;
pub use retry::{
    calculate_backoff, RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX,
    DEFAULT_NETWORK_RETRIES, DEFAULT_RATE_LIMIT_RETRIES,
};
