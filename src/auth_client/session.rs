//! Per-host session cache
//!
//! Holds session material between discovery and subsequent fetches.
//! The external restart monitor calls `invalidate_session` after a
//! device reboot, since a reboot invalidates all prior sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::types::SessionToken;

#[derive(Default)]
pub struct SessionCache {
    sessions: Arc<RwLock<HashMap<String, SessionToken>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, host: &str, token: SessionToken) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(host.to_string(), token);
    }

    pub async fn get(&self, host: &str) -> Option<SessionToken> {
        let sessions = self.sessions.read().await;
        sessions.get(host).cloned()
    }

    /// Drop the session for one host. Called by the restart monitor
    /// when it detects the device came back from a reboot.
    pub async fn invalidate_session(&self, host: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(host).is_some() {
            info!(host = %host, "Session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_removes_only_named_host() {
        let cache = SessionCache::new();
        cache
            .store("192.168.100.1", SessionToken::from_cookie("credential", "a"))
            .await;
        cache
            .store("192.168.100.2", SessionToken::from_cookie("credential", "b"))
            .await;

        cache.invalidate_session("192.168.100.1").await;
        assert!(cache.get("192.168.100.1").await.is_none());
        assert!(cache.get("192.168.100.2").await.is_some());

        // Idempotent on unknown hosts
        cache.invalidate_session("10.0.0.1").await;
    }
}
