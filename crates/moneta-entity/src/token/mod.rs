//! Refresh-token record entity and device metadata.

pub mod device;
pub mod model;

pub use device::DeviceMetadata;
pub use model::{RefreshTokenRecord, RevocationReason};
