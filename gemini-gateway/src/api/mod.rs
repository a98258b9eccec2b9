//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Generation** (`/gemini-api/*`): one endpoint per input modality, all answering with
//!   [`models::envelope::ResponseEnvelope`]
//! - **Chat page** (`/`): the embedded browser client
//!
//! All generation endpoints are documented with `utoipa`; the rendered reference is served at
//! `/docs`.

pub mod handlers;
pub mod models;
