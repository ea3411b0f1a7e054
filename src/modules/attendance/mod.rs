//! Attendance sessions: draft marks, gated submission, end-of-day check.
//!
//! Each (date, session, class) key moves `Unmarked -> Drafted -> Submitted`.
//! Submission freezes the key's summary; there is no way back.

pub mod controller;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;
pub mod router;
pub mod service;
pub mod sheet;
