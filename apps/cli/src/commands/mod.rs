//! Command implementations for the Caregate CLI.

pub mod check;
pub mod quotas;
pub mod route;
pub mod stats;
