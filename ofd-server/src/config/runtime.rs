//! Runtime configuration shared across request handlers.
//!
//! Each section lives behind its own `Arc<RwLock<..>>` so a SIGHUP reload
//! swaps sections independently without blocking unrelated readers.

use ofd_core::entities::Role;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Server section of the runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// A resolved access token: the credential bytes plus the identity it grants.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub subject_id: Uuid,
    pub role: Role,
}

/// Runtime configuration with per-section locks.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub access_tokens: Arc<RwLock<Vec<AccessToken>>>,
}

/// Look up a presented bearer token against the configured token set.
///
/// Every configured token is compared in constant time regardless of where
/// (or whether) a match occurs, so timing reveals nothing about prefixes.
pub fn authenticate(tokens: &[AccessToken], presented: &str) -> Option<(Uuid, Role)> {
    let mut found = None;
    for entry in tokens {
        if ring::constant_time::verify_slices_are_equal(
            entry.token.as_bytes(),
            presented.as_bytes(),
        )
        .is_ok()
        {
            found = Some((entry.subject_id, entry.role));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str, role: Role) -> AccessToken {
        AccessToken {
            token: value.to_string(),
            subject_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn authenticate_matches_exact_token_only() {
        let tokens = vec![token("alpha", Role::Shipper), token("bravo", Role::Driver)];
        let (subject, role) = authenticate(&tokens, "bravo").unwrap();
        assert_eq!(subject, tokens[1].subject_id);
        assert_eq!(role, Role::Driver);

        assert!(authenticate(&tokens, "bravo2").is_none());
        assert!(authenticate(&tokens, "brav").is_none());
        assert!(authenticate(&tokens, "").is_none());
    }
}
