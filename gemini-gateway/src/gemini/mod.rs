//! Gemini integration: wire types, the HTTP client and the dispatcher that sits on top.
//!
//! - [`types`]: request/response bodies for `generateContent`
//! - [`client`]: the [`GenerateContent`] seam and its `reqwest` implementation
//! - [`dispatcher`]: payload assembly and text extraction

pub mod client;
pub mod dispatcher;
pub mod types;

pub use client::{GeminiClient, GenerateContent};
pub use dispatcher::{Dispatcher, GenerationOutput};
