//! Request extractors for cross-cutting concerns.
//!
//! - [`school`]: tenant (`X-School-Id`) and acting user (`X-User-Id`)
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::school::SchoolContext;
//!
//! async fn list(ctx: SchoolContext) -> impl IntoResponse {
//!     // every repository call is scoped by ctx.school_id
//! }
//! ```

pub mod school;
