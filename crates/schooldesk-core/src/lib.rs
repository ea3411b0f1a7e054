//! # SchoolDesk Core
//!
//! Foundational types shared by every SchoolDesk crate:
//!
//! - [`errors`]: the [`AppError`] type returned by services and handlers,
//!   plus the [`ErrorStatus`] trait that lets domain errors pick their HTTP
//!   status.
//! - [`pagination`]: query parameters and response metadata for list
//!   endpoints.
//!
//! # Example
//!
//! ```ignore
//! use schooldesk_core::{AppError, AppResult};
//!
//! fn find(id: i64) -> AppResult<String> {
//!     Err(AppError::not_found(anyhow::anyhow!("Record {} not found", id)))
//! }
//! ```

pub mod errors;
pub mod pagination;

pub use errors::{AppError, AppResult, ErrorResponse, ErrorStatus};
pub use pagination::{PaginationMeta, PaginationParams};

// Re-exported so domain crates can implement `ErrorStatus` without an axum dependency
pub use axum::http::StatusCode;
