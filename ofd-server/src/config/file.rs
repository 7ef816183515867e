//! TOML file configuration structures.
//!
//! These structs directly map to the `ofd-config.toml` file format.

use ofd_sdk::objects::Role;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub access_tokens: Vec<AccessTokenConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// One pre-shared access token, mapping a bearer credential to a subject
/// and role. Issued out of band by the platform's identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenConfig {
    /// The opaque bearer token value.
    pub token: String,
    /// The user this token authenticates as.
    pub subject_id: Uuid,
    /// The role carried by the credential.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[[access_tokens]]
token = "shipper-token-1"
subject_id = "d2b8a1e0-0000-0000-0000-000000000001"
role = "shipper"

[[access_tokens]]
token = "driver-token-1"
subject_id = "d2b8a1e0-0000-0000-0000-000000000002"
role = "driver"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.access_tokens.len(), 2);
        assert_eq!(config.access_tokens[1].role, Role::Driver);
    }

    #[test]
    fn test_listen_defaults_when_missing() {
        let config: FileConfig = toml::from_str("[server]\n").unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.access_tokens.is_empty());
    }
}
