//! Circulation data models and DTOs.
//!
//! Re-exports the library models from the `schooldesk-models` crate.

pub use schooldesk_models::library::*;
