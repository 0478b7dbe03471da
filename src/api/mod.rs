//! HTTP plumbing for the DiMediaNet endpoints.

mod client;
mod error;

pub use client::{ApiClient, LoginResult};
pub use error::ApiError;
