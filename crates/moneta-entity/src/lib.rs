//! # moneta-entity
//!
//! Domain entity models for the Moneta account-security core: user accounts
//! with their security state, refresh-token records, and single-use
//! verification tokens.

pub mod token;
pub mod user;
pub mod verification;

pub use token::{DeviceMetadata, RefreshTokenRecord, RevocationReason};
pub use user::{User, UserStatus};
pub use verification::{TokenPurpose, VerificationToken};
