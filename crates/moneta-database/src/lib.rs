//! # moneta-database
//!
//! PostgreSQL connection management, migrations, and thin repositories for
//! the Moneta account-security core. No business logic lives here; the
//! rotation engine drives these through the store traits in `moneta-auth`.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
