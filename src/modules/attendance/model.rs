//! Attendance data models and DTOs.
//!
//! Re-exports the attendance models from the `schooldesk-models` crate.

pub use schooldesk_models::attendance::*;
