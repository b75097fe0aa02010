//! Single-use verification and password-reset token entities.

pub mod model;

pub use model::{TokenPurpose, VerificationToken};
