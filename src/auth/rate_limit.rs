use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use crate::config::{GroupLimitConfig, RateLimitSettings};

/// Route groups with independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Auth,
    Resume,
    Generation,
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteGroup::Auth => "auth",
            RouteGroup::Resume => "resume",
            RouteGroup::Generation => "generation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct GroupPolicy {
    pub window: Duration,
    pub max_requests: u32,
    pub message: String,
}

impl From<&GroupLimitConfig> for GroupPolicy {
    fn from(config: &GroupLimitConfig) -> Self {
        Self {
            window: config.window(),
            max_requests: config.max_requests,
            message: config.message.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub auth: GroupPolicy,
    pub resume: GroupPolicy,
    pub generation: GroupPolicy,
}

impl RateLimitConfig {
    pub fn policy(&self, group: RouteGroup) -> &GroupPolicy {
        match group {
            RouteGroup::Auth => &self.auth,
            RouteGroup::Resume => &self.resume,
            RouteGroup::Generation => &self.generation,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            auth: (&settings.auth).into(),
            resume: (&settings.resume).into(),
            generation: (&settings.generation).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug)]
struct WindowCounter {
    window_start: i64,
    count: u32,
}

/// Fixed-window request counter keyed by client and route group.
///
/// Windows are aligned to wall-clock multiples of the group's window length,
/// so every client's counter resets at the same instant.
pub struct RateLimiter {
    windows: RwLock<HashMap<(RouteGroup, String), WindowCounter>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn policy(&self, group: RouteGroup) -> &GroupPolicy {
        self.config.policy(group)
    }

    pub async fn check_rate_limit(&self, client_key: &str, group: RouteGroup) -> RateDecision {
        self.check_rate_limit_at(client_key, group, Utc::now()).await
    }

    pub async fn check_rate_limit_at(
        &self,
        client_key: &str,
        group: RouteGroup,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let policy = self.config.policy(group);
        let window_ms = window_millis(policy.window);
        let now_ms = now.timestamp_millis();
        let window_start = now_ms.div_euclid(window_ms) * window_ms;

        let mut windows = self.windows.write().await;
        let counter = windows
            .entry((group, client_key.to_string()))
            .or_insert(WindowCounter { window_start, count: 0 });

        if counter.window_start != window_start {
            counter.window_start = window_start;
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);

        if counter.count <= policy.max_requests {
            RateDecision::Allowed {
                remaining: policy.max_requests - counter.count,
            }
        } else {
            let remaining_ms = (window_start + window_ms - now_ms).max(0);
            RateDecision::Limited {
                retry_after: Duration::from_millis(remaining_ms as u64),
            }
        }
    }

    /// Removes counters whose window has already closed.
    pub async fn cleanup(&self) {
        self.cleanup_at(Utc::now()).await
    }

    pub async fn cleanup_at(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        let config = &self.config;
        let mut windows = self.windows.write().await;
        windows.retain(|(group, _), counter| {
            let window_ms = window_millis(config.policy(*group).window);
            counter.window_start + window_ms > now_ms
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

fn window_millis(window: Duration) -> i64 {
    (window.as_millis() as i64).max(1)
}

/// Derives the rate-limit key for a request.
///
/// The chain is the socket peer followed by the `X-Forwarded-For` entries from
/// nearest to furthest. Exactly `trusted_hops` proxies are trusted, so the
/// entry at that position is the client. Spoofed entries further left are
/// never reached.
pub fn client_key(
    peer_addr: Option<SocketAddr>,
    forwarded_for: Option<&str>,
    trusted_hops: usize,
) -> String {
    let peer = match peer_addr {
        Some(addr) => addr.ip().to_string(),
        None => return "unknown".to_string(),
    };
    if trusted_hops == 0 {
        return peer;
    }

    let mut chain = vec![peer];
    if let Some(header) = forwarded_for {
        chain.extend(
            header
                .split(',')
                .rev()
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(normalize_forwarded_entry),
        );
    }

    let index = trusted_hops.min(chain.len() - 1);
    chain.swap_remove(index)
}

// Proxies sometimes append the port; the key is the address alone.
fn normalize_forwarded_entry(entry: &str) -> String {
    if let Ok(addr) = entry.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = entry.parse::<IpAddr>() {
        return ip.to_string();
    }
    entry.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy(max_requests: u32, window_secs: u64) -> GroupPolicy {
        GroupPolicy {
            window: Duration::from_secs(window_secs),
            max_requests,
            message: "slow down".into(),
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            auth: policy(3, 60),
            resume: policy(5, 60),
            generation: policy(1, 10),
        })
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = limiter();
        let start = at(1_700_000_040); // 1_700_000_040 is a multiple of 60

        // Should allow requests up to limit
        for i in 0..3 {
            let decision = limiter.check_rate_limit_at("10.0.0.1", RouteGroup::Auth, start).await;
            assert_eq!(decision, RateDecision::Allowed { remaining: 2 - i });
        }

        // Should deny requests over limit
        let decision = limiter
            .check_rate_limit_at("10.0.0.1", RouteGroup::Auth, start + chrono::Duration::seconds(15))
            .await;
        assert_eq!(decision, RateDecision::Limited { retry_after: Duration::from_secs(45) });

        // Next window starts from zero
        let next = start + chrono::Duration::seconds(60);
        assert!(limiter.check_rate_limit_at("10.0.0.1", RouteGroup::Auth, next).await.is_allowed());
    }

    #[tokio::test]
    async fn test_windows_are_wall_clock_aligned() {
        let limiter = limiter();
        // Two requests straddling a 10s boundary land in different windows.
        let before = at(1_700_000_009);
        let after = at(1_700_000_010);

        assert!(limiter.check_rate_limit_at("c", RouteGroup::Generation, before).await.is_allowed());
        assert!(limiter.check_rate_limit_at("c", RouteGroup::Generation, after).await.is_allowed());
        assert!(!limiter.check_rate_limit_at("c", RouteGroup::Generation, after).await.is_allowed());
    }

    #[tokio::test]
    async fn test_groups_and_clients_are_independent() {
        let limiter = limiter();
        let now = at(1_700_000_000);

        for _ in 0..3 {
            assert!(limiter.check_rate_limit_at("a", RouteGroup::Auth, now).await.is_allowed());
        }
        assert!(!limiter.check_rate_limit_at("a", RouteGroup::Auth, now).await.is_allowed());

        assert!(limiter.check_rate_limit_at("a", RouteGroup::Resume, now).await.is_allowed());
        assert!(limiter.check_rate_limit_at("b", RouteGroup::Auth, now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_cleanup_drops_closed_windows() {
        let limiter = limiter();
        let now = at(1_700_000_000);

        limiter.check_rate_limit_at("a", RouteGroup::Auth, now).await;
        limiter.check_rate_limit_at("b", RouteGroup::Generation, now).await;
        assert_eq!(limiter.tracked_keys().await, 2);

        // Generation windows are 10s, auth windows 60s.
        limiter.cleanup_at(now + chrono::Duration::seconds(15)).await;
        assert_eq!(limiter.tracked_keys().await, 1);

        limiter.cleanup_at(now + chrono::Duration::seconds(120)).await;
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[tokio::test]
    async fn test_real_clock_window_reset() {
        let limiter = RateLimiter::new(RateLimitConfig {
            auth: policy(2, 1),
            resume: policy(2, 1),
            generation: policy(2, 1),
        });

        // Start right after a boundary so the burst fits in one window.
        let now_ms = Utc::now().timestamp_millis();
        let to_boundary = 1000 - now_ms.rem_euclid(1000);
        tokio::time::sleep(Duration::from_millis(to_boundary as u64 + 10)).await;

        assert!(limiter.check_rate_limit("k", RouteGroup::Auth).await.is_allowed());
        assert!(limiter.check_rate_limit("k", RouteGroup::Auth).await.is_allowed());
        assert!(!limiter.check_rate_limit("k", RouteGroup::Auth).await.is_allowed());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check_rate_limit("k", RouteGroup::Auth).await.is_allowed());
    }

    #[test]
    fn test_client_key_without_proxy() {
        let peer: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        assert_eq!(client_key(Some(peer), Some("1.2.3.4"), 0), "203.0.113.7");
        assert_eq!(client_key(Some(peer), None, 0), "203.0.113.7");
        assert_eq!(client_key(None, Some("1.2.3.4"), 1), "unknown");
    }

    #[test]
    fn test_client_key_trusts_configured_hops() {
        let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();

        // One trusted proxy: the rightmost entry is the client, spoofed
        // entries on the left are ignored.
        let xff = "6.6.6.6, 198.51.100.23";
        assert_eq!(client_key(Some(proxy), Some(xff), 1), "198.51.100.23");

        // Two trusted proxies: skip one more hop.
        let xff = "198.51.100.23, 10.0.0.1";
        assert_eq!(client_key(Some(proxy), Some(xff), 2), "198.51.100.23");
    }

    #[test]
    fn test_client_key_short_chain_falls_back_to_furthest() {
        let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();
        assert_eq!(client_key(Some(proxy), Some("198.51.100.23"), 3), "198.51.100.23");
        assert_eq!(client_key(Some(proxy), None, 1), "10.0.0.2");
        assert_eq!(client_key(Some(proxy), Some(" , "), 1), "10.0.0.2");
    }

    #[test]
    fn test_client_key_strips_ports() {
        let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();
        assert_eq!(client_key(Some(proxy), Some("198.51.100.23:8080"), 1), "198.51.100.23");
    }
}
