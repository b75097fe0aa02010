//! # moneta-core
//!
//! Core crate for the Moneta account-security service. Contains the
//! configuration schemas, typed identifiers, telemetry setup, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Moneta crates.

pub mod config;
pub mod error;
pub mod result;
pub mod telemetry;
pub mod types;

pub use error::AuthError;
pub use result::AuthResult;
