//! Password hashing capability.

pub mod hasher;

pub use hasher::PasswordHasher;
