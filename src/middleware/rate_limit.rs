//! In-memory sliding-window limiter for the generation endpoints.
//!
//! The budget counts records, not HTTP requests: each record can cost one
//! outbound generation call, so a batch is charged once per record.
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    trust_forwarded: bool,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
            trust_forwarded: false,
        }
    }

    /// Keys clients on the first `x-forwarded-for` hop when a trusted proxy sets it.
    pub fn trust_forwarded(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    /// Records one hit for `client` and reports whether it is within the limit.
    pub async fn check(&self, client: &str) -> bool {
        self.check_n(client, 1).await
    }

    /// Records `cost` hits at once. Either all of them fit or none is recorded.
    pub async fn check_n(&self, client: &str, cost: usize) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let history = requests.entry(client.to_string()).or_default();
        history.retain(|&at| now.duration_since(at) < self.window);

        if history.len() + cost <= self.max_requests {
            history.extend(std::iter::repeat(now).take(cost));
            true
        } else {
            false
        }
    }

    /// Drops clients with no hits inside the window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, history| {
            history.retain(|&at| now.duration_since(at) < self.window);
            !history.is_empty()
        });
        tracing::debug!("rate limiter cleanup: {} active clients", requests.len());
    }

    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        client_key(headers, peer, self.trust_forwarded)
    }
}

/// Peer IP of the connection. The forwarded header only counts when the
/// deployment says a proxy rewrites it; otherwise any client could rotate it.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = trust_forwarded
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_per_client() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_check_n_is_all_or_nothing() {
        let limiter = RateLimiter::new(5, 60);
        assert!(limiter.check_n("a", 4).await);
        assert!(!limiter.check_n("a", 2).await);
        // the rejected charge left the remaining hit available
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired() {
        let limiter = RateLimiter::new(5, 1);
        limiter.check("a").await;
        limiter.check("b").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.cleanup().await;

        assert!(limiter.requests.read().await.is_empty());
    }

    #[test]
    fn test_client_key_uses_peer() {
        let peer: SocketAddr = "192.0.2.10:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());

        assert_eq!(client_key(&headers, Some(peer), false), "192.0.2.10");
        assert_eq!(client_key(&HeaderMap::new(), None, false), "unknown");
    }

    #[test]
    fn test_client_key_trusted_proxy() {
        let peer: SocketAddr = "192.0.2.10:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer), true), "192.0.2.10");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
    }
}
