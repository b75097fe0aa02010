//! # moneta-auth
//!
//! The token-lifecycle core of the Moneta service: access-token codec,
//! opaque refresh secrets, the rotation engine with family-based reuse
//! detection, concurrent-session limiting, account lockout, and single-use
//! verification/reset tokens.
//!
//! ## Modules
//!
//! - `jwt` — stateless access-token encoding and verification
//! - `token` — opaque refresh-secret generation and lookup hashing
//! - `password` — Argon2id password hashing capability
//! - `store` — persistence traits with in-memory and Postgres backends
//! - `session` — rotation engine, session limiter, and record sweeper
//! - `lockout` — failed-attempt counting and timed account locks
//! - `verification` — single-use email-verification and reset tokens
//! - `email` — fire-and-forget mail dispatch contract

pub mod email;
pub mod jwt;
pub mod lockout;
pub mod password;
pub mod session;
pub mod store;
pub mod token;
pub mod verification;

pub use email::{EmailSender, NoopEmailSender};
pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use lockout::LockoutTracker;
pub use password::PasswordHasher;
pub use session::{IssuedTokens, SessionLimiter, SessionManager, TokenSweeper};
pub use store::{AccountStore, RefreshTokenStore, VerificationTokenStore};
pub use token::RefreshSecret;
pub use verification::VerificationTokenIssuer;
