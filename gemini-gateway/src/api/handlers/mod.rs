//! HTTP request handlers.
//!
//! - [`generate`]: the four `/gemini-api` generation endpoints
//! - [`static_assets`]: the embedded chat page
//!
//! Handlers return [`crate::errors::Error`] on failure, which renders as the same JSON envelope
//! a successful call produces.

pub mod generate;
pub mod static_assets;
