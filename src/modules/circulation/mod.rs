//! Library circulation: issue, renew, return, fines and accession lookup.
//!
//! [`rules`] holds the lending arithmetic, [`service`] sequences it against a
//! [`repository::CirculationRepository`].

pub mod controller;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
