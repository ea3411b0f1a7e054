//! # SchoolDesk CLI
//!
//! Administrative tooling used by the `schooldesk-cli` binary:
//!
//! - [`seeder`]: fake schools, classes, students, library members and book copies
//! - [`overdue`]: open loans past their due date, with the fine a return would record
//!
//! ## Usage
//!
//! ```ignore
//! use schooldesk_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 schools with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod overdue;
pub mod seeder;
