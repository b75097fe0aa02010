//! Single-use verification and password-reset tokens.

pub mod issuer;

pub use issuer::{IssuedVerification, VerificationTokenIssuer};
