//! API request and response data models.

pub mod envelope;
pub mod generate;
