//! HTTP layer: download client with retry and error classification.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::NonRetryableError;
