//! Best-effort client device description attached to sessions.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Descriptive information about the client that created a session.
///
/// Informational only: no invariant depends on these fields, and they are
/// surfaced verbatim in session listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeviceMetadata {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
}

impl DeviceMetadata {
    /// Build metadata from the pieces a transport layer can extract.
    ///
    /// The IP is the first entry of the forwarded-for header when present,
    /// otherwise the peer socket address.
    pub fn from_parts(
        forwarded_for: Option<&str>,
        peer_addr: Option<IpAddr>,
        user_agent: Option<&str>,
    ) -> Self {
        let ip_address = forwarded_for
            .and_then(|h| h.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| peer_addr.map(|a| a.to_string()));

        Self {
            ip_address,
            user_agent: user_agent.map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_forwarded_entry_wins() {
        let meta = DeviceMetadata::from_parts(
            Some("203.0.113.7, 10.0.0.1"),
            Some("127.0.0.1".parse().unwrap()),
            Some("test-agent"),
        );
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let meta = DeviceMetadata::from_parts(None, Some("192.0.2.4".parse().unwrap()), None);
        assert_eq!(meta.ip_address.as_deref(), Some("192.0.2.4"));
        assert!(meta.user_agent.is_none());
    }

    #[test]
    fn test_empty_header_falls_back() {
        let meta = DeviceMetadata::from_parts(Some(""), Some("192.0.2.4".parse().unwrap()), None);
        assert_eq!(meta.ip_address.as_deref(), Some("192.0.2.4"));
    }
}
