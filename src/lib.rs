//! # SchoolDesk API
//!
//! A REST API built with Rust, Axum, and PostgreSQL for the two rule-heavy
//! corners of running a school: the library desk and class attendance.
//!
//! ## Overview
//!
//! - **Circulation**: issue, renew and return book copies, assess and settle
//!   overdue fines, and find a copy by accession number
//! - **Attendance**: default-present session sheets, manual head-count
//!   cross-checks, one-way submission and morning/afternoon verification
//!
//! ## Architecture
//!
//! The codebase follows a modular layout inspired by NestJS:
//!
//! ```text
//! src/
//! ├── middleware/       # School scoping extractor
//! ├── modules/          # Feature modules
//! │   ├── circulation/  # Library circulation engine
//! │   └── attendance/   # Attendance session reconciler
//! ├── docs.rs           # OpenAPI document
//! ├── logging.rs        # Tracing subscriber and request logging
//! ├── metrics.rs        # Prometheus metrics
//! ├── router.rs         # Route tree and layers
//! ├── state.rs          # Shared application state
//! └── validator.rs      # Validated JSON extractor
//! ```
//!
//! Each feature module follows a consistent structure:
//!
//! - `model.rs`: entities and DTOs (re-exported from `schooldesk-models`)
//! - `repository.rs`: persistence trait, with `postgres.rs` and an in-memory
//!   `memory.rs` implementation
//! - `service.rs`: business rules
//! - `controller.rs`: HTTP handlers
//! - `router.rs`: Axum router configuration
//!
//! ## School scoping
//!
//! Every request carries an `X-School-Id` header; an optional `X-User-Id`
//! identifies who recorded or submitted attendance. All reads and writes are
//! filtered by the school.
//!
//! ## Consistency
//!
//! Eligibility, copy availability and the one-way submission flag are
//! re-checked inside the write itself (conditional `UPDATE`s and upserts in
//! a single transaction), so concurrent desks cannot double-issue a copy or
//! submit a session twice.
//!
//! ## Workspace crates
//!
//! - [`schooldesk_core`]: `AppError`, pagination
//! - [`schooldesk_config`]: environment-driven configuration
//! - [`schooldesk_db`]: pool and migrations
//! - [`schooldesk_models`]: typed ids, entities, DTOs and domain errors

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use schooldesk_config;
pub use schooldesk_core;
pub use schooldesk_db;
pub use schooldesk_models;
