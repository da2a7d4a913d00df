use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::token::{CacheKey, CachedToken};
use crate::config::environment::Environment;
use crate::helpers::time::{get_instant, Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::sources::{ClientCredentials, HttpTokenExchange, TokenError};

pub const DEFAULT_CACHE_NAME: &str = "default";

/// Memoizes client-credentials tokens per (client id, environment, scope)
/// until they near expiry.
///
/// One instance is built at startup and shared through the server state.
/// Misses on the same key are coalesced: only one exchange is in flight per
/// key, later callers wait for it and reuse the stored token.
pub struct TokenCache {
    /// `cache` label of the `cached_tokens` gauge
    name: String,
    inner: RwLock<HashMap<CacheKey, CachedToken>>,
    flights: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    exchange: HttpTokenExchange,
    clock: Arc<dyn Clock>,
    safety_margin_ms: i64,
}

impl TokenCache {
    pub fn new(exchange: HttpTokenExchange, safety_margin_seconds: u64) -> Self {
        Self::with_clock(exchange, safety_margin_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(
        exchange: HttpTokenExchange,
        safety_margin_seconds: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_owned(),
            inner: RwLock::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            exchange,
            clock,
            safety_margin_ms: i64::try_from(safety_margin_seconds)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
        }
    }

    /// Sets the label this instance reports its size under.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a bearer token for the credentials, exchanging for a new one
    /// only when no fresh entry exists for the key. Exchange failures are
    /// returned as is and leave the cache untouched.
    pub async fn get_access_token(
        &self,
        credentials: &ClientCredentials,
        environment: Environment,
        scope: Option<&str>,
    ) -> Result<String, TokenError> {
        credentials.validate()?;

        let metrics = get_metrics().await;
        let key = CacheKey::new(credentials.client_id.as_str(), environment, scope.map(str::to_owned));

        if let Some(token) = self.get(&key).await {
            debug!("token cache hit for {}", key);
            metrics.token_cache_hits.with_label_values(&[environment.as_str()]).inc();
            return Ok(token.token);
        }

        let flight = self.flight(&key).await;
        let result = {
            let _in_flight = flight.lock().await;
            self.refresh(&key, credentials, scope).await
        };
        self.release_flight(&key, flight).await;
        result
    }

    /// Runs under the key's flight guard.
    async fn refresh(
        &self,
        key: &CacheKey,
        credentials: &ClientCredentials,
        scope: Option<&str>,
    ) -> Result<String, TokenError> {
        let metrics = get_metrics().await;
        let env_label = key.environment.as_str();

        // another caller may have refreshed while we waited
        if let Some(token) = self.get(key).await {
            debug!("token cache hit for {} after waiting on in-flight exchange", key);
            metrics.token_cache_hits.with_label_values(&[env_label]).inc();
            return Ok(token.token);
        }

        metrics.token_cache_misses.with_label_values(&[env_label]).inc();
        info!("fetching token for {}", key);

        let start = get_instant();
        let response = self
            .exchange
            .exchange(credentials, key.environment, scope)
            .await
            .inspect_err(|e| {
                metrics
                    .token_exchange_failures
                    .with_label_values(&[env_label, e.reason()])
                    .inc();
            });
        metrics
            .token_exchange_duration
            .with_label_values(&[env_label])
            .observe(start.elapsed().as_secs_f64());
        let response = response?;

        let expires_at_ms = self.expires_at_ms(response.expires_in);
        let token = CachedToken::new(response.access_token, expires_at_ms);

        let size = {
            let mut map = self.inner.write().await;
            map.insert(key.clone(), token.clone());
            map.len()
        };
        metrics
            .cached_tokens
            .with_label_values(&[self.name.as_str()])
            .set(size as i64);
        debug!("stored token for {}, expires at {} ms", key, expires_at_ms);

        Ok(token.token)
    }

    /// `now + expires_in - margin`, saturating at the i64 bounds.
    fn expires_at_ms(&self, expires_in_seconds: u64) -> i64 {
        let lifetime_ms = i64::try_from(expires_in_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        self.clock
            .now_ms()
            .saturating_add(lifetime_ms)
            .saturating_sub(self.safety_margin_ms)
    }

    /// Get token if it exists and is not expired
    pub async fn get(&self, key: &CacheKey) -> Option<CachedToken> {
        let now_ms = self.clock.now_ms();
        self.inner
            .read()
            .await
            .get(key)
            .filter(|token| token.is_fresh(now_ms))
            .cloned()
    }

    /// Stored entry regardless of expiry.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedToken> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    async fn flight(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.flights
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Drops the caller's handle on the key's guard and removes the guard once
    /// nobody else holds it. Handles are only cloned and dropped under the
    /// `flights` lock, so the count is exact here.
    async fn release_flight(&self, key: &CacheKey, flight: Arc<Mutex<()>>) {
        let mut flights = self.flights.lock().await;
        drop(flight);
        let idle = flights
            .get(key)
            .is_some_and(|current| Arc::strong_count(current) == 1);
        if idle {
            flights.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::helpers::time::ManualClock;
    use crate::tests::common::{basic_auth, build_reqwest_client, vendor_config};
    use crate::utils::constants::TOKEN_PATH;

    const T0: i64 = 1_700_000_000_000;

    fn cache(sandbox: &MockServer, production: &MockServer, clock: Arc<ManualClock>) -> TokenCache {
        let vendor = vendor_config(&sandbox.base_url(), &production.base_url());
        let exchange = HttpTokenExchange::new(build_reqwest_client(), vendor);
        TokenCache::with_clock(exchange, 60, clock)
    }

    fn creds() -> ClientCredentials {
        ClientCredentials::new("client-1", "secret-1")
    }

    #[tokio::test]
    async fn cache_hit_avoids_network_call() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .header("authorization", basic_auth("client-1", "secret-1"))
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("grant_type=client_credentials");
                then.status(200)
                    .json_body(json!({"access_token": "tok-1", "expires_in": 3600, "token_type": "bearer"}));
            })
            .await;
        let clock = Arc::new(ManualClock::new(T0));
        let cache = cache(&sandbox, &production, clock.clone());

        let first = cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();
        clock.advance(Duration::from_secs(600));
        let second = cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();

        assert_eq!(first, "tok-1");
        assert_eq!(second, "tok-1");
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn expiry_forces_refetch() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-1", "expires_in": 120}));
            })
            .await;
        let clock = Arc::new(ManualClock::new(T0));
        let cache = cache(&sandbox, &production, clock.clone());

        cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();
        clock.advance(Duration::from_secs(121));
        cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();

        assert_eq!(mock.hits_async().await, 2);
    }

    #[tokio::test]
    async fn scope_isolates_cache_entries() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let scope_a = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials&scope=a");
                then.status(200).json_body(json!({"access_token": "tok-a", "expires_in": 3600}));
            })
            .await;
        let scope_b = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials&scope=b");
                then.status(200).json_body(json!({"access_token": "tok-b", "expires_in": 3600}));
            })
            .await;
        let no_scope = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials");
                then.status(200).json_body(json!({"access_token": "tok-none", "expires_in": 3600}));
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        for _ in 0..2 {
            assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, Some("a")).await.unwrap(), "tok-a");
            assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, Some("b")).await.unwrap(), "tok-b");
            assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap(), "tok-none");
        }

        assert_eq!(scope_a.hits_async().await, 1);
        assert_eq!(scope_b.hits_async().await, 1);
        assert_eq!(no_scope.hits_async().await, 1);
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn environment_isolates_cache_entries() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let sandbox_mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-sandbox", "expires_in": 3600}));
            })
            .await;
        let production_mock = production
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-prod", "expires_in": 3600}));
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        let s = cache.get_access_token(&creds(), Environment::Sandbox, Some("x")).await.unwrap();
        let p = cache.get_access_token(&creds(), Environment::Production, Some("x")).await.unwrap();
        let s_again = cache.get_access_token(&creds(), Environment::Sandbox, Some("x")).await.unwrap();

        assert_eq!(s, "tok-sandbox");
        assert_eq!(p, "tok-prod");
        assert_eq!(s_again, "tok-sandbox");
        assert_eq!(sandbox_mock.hits_async().await, 1);
        assert_eq!(production_mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn safety_margin_is_subtracted_from_lifetime() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-1", "expires_in": 3600}));
            })
            .await;
        let clock = Arc::new(ManualClock::new(T0));
        let cache = cache(&sandbox, &production, clock.clone());
        let key = CacheKey::new("client-1", Environment::Sandbox, None);

        cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();
        let stored = cache.peek(&key).await.unwrap();
        assert_eq!(stored.expires_at_ms, T0 + 3_600_000 - 60_000);

        // one millisecond before the margin starts, still a hit
        clock.set(T0 + 3_600_000 - 60_001);
        cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();
        assert_eq!(mock.hits_async().await, 1);

        // inside the margin but before nominal expiry
        clock.set(T0 + 3_600_000 - 30_000);
        cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();
        assert_eq!(mock.hits_async().await, 2);
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected_before_network() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-1", "expires_in": 3600}));
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        let no_id = cache
            .get_access_token(&ClientCredentials::new("", "secret"), Environment::Sandbox, None)
            .await;
        let no_secret = cache
            .get_access_token(&ClientCredentials::new("client", ""), Environment::Sandbox, None)
            .await;

        assert!(matches!(no_id, Err(TokenError::InvalidCredentials(_))));
        assert!(matches!(no_secret, Err(TokenError::InvalidCredentials(_))));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn rejected_exchange_is_propagated_and_not_cached() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({"error": "invalid_client"}));
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        for _ in 0..2 {
            match cache.get_access_token(&creds(), Environment::Sandbox, None).await {
                Err(TokenError::Rejected { status, content_type, body }) => {
                    assert_eq!(status.as_u16(), 401);
                    assert_eq!(content_type.as_deref(), Some("application/json"));
                    assert!(body.contains("invalid_client"));
                }
                other => panic!("expected rejected exchange, got {:?}", other),
            }
        }

        assert_eq!(mock.hits_async().await, 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_error() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).body("<html>maintenance</html>");
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        let result = cache.get_access_token(&creds(), Environment::Sandbox, None).await;

        assert!(matches!(result, Err(TokenError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let vendor = vendor_config("http://127.0.0.1:1", "http://127.0.0.1:1");
        let exchange = HttpTokenExchange::new(build_reqwest_client(), vendor);
        let cache = TokenCache::with_clock(exchange, 60, Arc::new(ManualClock::new(T0)));

        let result = cache.get_access_token(&creds(), Environment::Production, None).await;

        assert!(matches!(result, Err(TokenError::Transport(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_exchange() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let mock = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200)
                    .delay(Duration::from_millis(200))
                    .json_body(json!({"access_token": "tok-shared", "expires_in": 3600}));
            })
            .await;
        let cache = Arc::new(cache(&sandbox, &production, Arc::new(ManualClock::new(T0))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.get_access_token(&creds(), Environment::Sandbox, Some("shared")).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "tok-shared");
        }
        assert_eq!(mock.hits_async().await, 1);
        assert!(cache.flights.lock().await.is_empty());
    }

    #[tokio::test]
    async fn flight_guards_are_released_after_success_and_failure() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials&scope=ok");
                then.status(200).json_body(json!({"access_token": "tok-ok", "expires_in": 3600}));
            })
            .await;
        sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials&scope=denied");
                then.status(403).body("forbidden");
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        cache.get_access_token(&creds(), Environment::Sandbox, Some("ok")).await.unwrap();
        assert!(cache.get_access_token(&creds(), Environment::Sandbox, Some("denied")).await.is_err());

        assert!(cache.flights.lock().await.is_empty());
    }

    #[tokio::test]
    async fn empty_scope_is_sent_as_an_empty_value() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        let empty_scope = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials&scope=");
                then.status(200).json_body(json!({"access_token": "tok-empty", "expires_in": 3600}));
            })
            .await;
        let no_scope = sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH).body("grant_type=client_credentials");
                then.status(200).json_body(json!({"access_token": "tok-none", "expires_in": 3600}));
            })
            .await;
        let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));

        assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, Some("")).await.unwrap(), "tok-empty");
        assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap(), "tok-none");
        assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, Some("")).await.unwrap(), "tok-empty");

        assert_eq!(empty_scope.hits_async().await, 1);
        assert_eq!(no_scope.hits_async().await, 1);
    }

    #[tokio::test]
    async fn huge_lifetimes_saturate_and_stay_cached() {
        for expires_in in [100_000_000_000_000_000_u64, u64::MAX] {
            let sandbox = MockServer::start_async().await;
            let production = MockServer::start_async().await;
            let mock = sandbox
                .mock_async(|when, then| {
                    when.method(POST).path(TOKEN_PATH);
                    then.status(200).json_body(json!({"access_token": "tok-long", "expires_in": expires_in}));
                })
                .await;
            let cache = cache(&sandbox, &production, Arc::new(ManualClock::new(T0)));
            let key = CacheKey::new("client-1", Environment::Sandbox, None);

            for _ in 0..2 {
                assert_eq!(cache.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap(), "tok-long");
            }

            assert_eq!(cache.peek(&key).await.unwrap().expires_at_ms, i64::MAX - 60_000);
            assert_eq!(mock.hits_async().await, 1, "expires_in = {}", expires_in);
        }
    }

    #[tokio::test]
    async fn size_gauge_is_reported_per_named_cache() {
        let sandbox = MockServer::start_async().await;
        let production = MockServer::start_async().await;
        sandbox
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok", "expires_in": 3600}));
            })
            .await;
        let first = cache(&sandbox, &production, Arc::new(ManualClock::new(T0))).named("gauge-first");
        let second = cache(&sandbox, &production, Arc::new(ManualClock::new(T0))).named("gauge-second");

        first.get_access_token(&creds(), Environment::Sandbox, Some("a")).await.unwrap();
        first.get_access_token(&creds(), Environment::Sandbox, Some("b")).await.unwrap();
        second.get_access_token(&creds(), Environment::Sandbox, None).await.unwrap();

        let gauge = &get_metrics().await.cached_tokens;
        assert_eq!(gauge.with_label_values(&["gauge-first"]).get(), 2);
        assert_eq!(gauge.with_label_values(&["gauge-second"]).get(), 1);
    }
}
