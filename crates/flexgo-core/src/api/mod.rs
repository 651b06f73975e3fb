//! REST API client module for the Climatix IC cloud.
//!
//! This module provides the `ApiClient` for single HTTP exchanges with the
//! API, the `RetryPolicy` applied around them, and the `ApiError` taxonomy
//! every public operation reports failures with.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{ApiClient, ApiRequest, RequestBody};
pub use error::ApiError;
pub use retry::RetryPolicy;
