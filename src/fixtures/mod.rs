//! In-memory stand-ins shared by unit and integration tests.

pub mod config;
pub mod providers;
pub mod vcs;
