//! Decision cache: policy evaluations routed through a [`LoadingCache`].
//!
//! A decision request is identified by the module, the entrypoint and the raw
//! input document. [`DecisionKey::derive`] turns those into an exact string
//! key; identical requests share one cached result and concurrent identical
//! requests share one evaluation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::cache::{Clock, LoadingCache, SystemClock};
use crate::cancel::CancelToken;
use crate::error::{ConfigError, LoadError};

/// Exact cache key for a decision request:
/// `module:entrypoint:<sha-256 hex of input>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecisionKey(String);

impl DecisionKey {
    pub fn derive(module: &str, entrypoint: &str, input: &[u8]) -> Self {
        Self(format!("{module}:{entrypoint}:{}", sha256_hex(input)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DecisionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Capacity and TTL of a [`DecisionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionCacheConfig {
    pub capacity: usize,
    /// Zero disables caching; every decision is evaluated.
    pub ttl: Duration,
}

impl Default for DecisionCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Caches decision results keyed by [`DecisionKey`].
#[derive(Debug)]
pub struct DecisionCache<V> {
    cache: LoadingCache<V>,
    ttl: Duration,
}

impl<V> DecisionCache<V> {
    /// # Errors
    ///
    /// [`ConfigError`] if `config.capacity` is zero.
    pub fn new(config: DecisionCacheConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// # Errors
    ///
    /// [`ConfigError`] if `config.capacity` is zero.
    pub fn with_clock(config: DecisionCacheConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if config.capacity == 0 {
            return Err(ConfigError::new("decision cache capacity must be > 0"));
        }
        Ok(Self {
            cache: LoadingCache::with_clock(config.capacity, clock),
            ttl: config.ttl,
        })
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The underlying loading cache.
    #[inline]
    pub fn cache(&self) -> &LoadingCache<V> {
        &self.cache
    }

    /// Drops the cached result for `key`. Returns `true` if one was mapped.
    pub fn invalidate(&self, key: &DecisionKey) -> bool {
        self.cache.delete(key.as_str())
    }
}

impl<V: Clone> DecisionCache<V> {
    /// Returns the cached decision for `key`, or runs `evaluate` to produce
    /// it. Failed evaluations are returned and never cached.
    ///
    /// # Errors
    ///
    /// Whatever `evaluate` returns, wrapped in [`LoadError::Loader`], or
    /// [`LoadError::Panicked`] if it panicked.
    pub fn decide<E, F>(
        &self,
        token: &CancelToken,
        key: &DecisionKey,
        evaluate: F,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce(&CancelToken, &str) -> Result<V, E>,
    {
        self.cache.get(token, key.as_str(), self.ttl, evaluate)
    }

    /// Cached, unexpired decision for `key`, without evaluating.
    pub fn cached(&self, key: &DecisionKey) -> Option<V> {
        self.cache.peek(key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Verdict {
        Allow,
        Deny,
    }

    #[test]
    fn key_is_exact_and_stable() {
        let key = DecisionKey::derive("authz", "allow", b"abc");
        assert_eq!(
            key.as_str(),
            "authz:allow:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(key, DecisionKey::derive("authz", "allow", b"abc"));
        assert_ne!(key, DecisionKey::derive("authz", "allow", b"abd"));
        assert_ne!(key, DecisionKey::derive("authz", "deny", b"abc"));
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn empty_input_hashes() {
        let key = DecisionKey::derive("m", "e", b"");
        assert!(key
            .as_str()
            .ends_with("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"));
    }

    #[test]
    fn zero_capacity_is_config_error() {
        let config = DecisionCacheConfig {
            capacity: 0,
            ..Default::default()
        };
        let err = DecisionCache::<Verdict>::new(config).unwrap_err();
        assert_eq!(err.to_string(), "decision cache capacity must be > 0");
    }

    #[test]
    fn decisions_are_cached_until_ttl() {
        let clock = Arc::new(ManualClock::new());
        let config = DecisionCacheConfig {
            capacity: 8,
            ttl: Duration::from_secs(5),
        };
        let cache = DecisionCache::with_clock(config, clock.clone()).unwrap();
        let key = DecisionKey::derive("authz", "allow", br#"{"user":"ann"}"#);
        let token = CancelToken::new();
        let evaluations = Cell::new(0);
        let evaluate = |_: &CancelToken, _: &str| {
            evaluations.set(evaluations.get() + 1);
            Ok::<_, String>(Verdict::Allow)
        };

        assert_eq!(cache.decide(&token, &key, evaluate).unwrap(), Verdict::Allow);
        assert_eq!(cache.decide(&token, &key, evaluate).unwrap(), Verdict::Allow);
        assert_eq!(evaluations.get(), 1);
        assert_eq!(cache.cached(&key), Some(Verdict::Allow));

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.cached(&key), None);
        cache.decide(&token, &key, evaluate).unwrap();
        assert_eq!(evaluations.get(), 2);
    }

    #[test]
    fn invalidate_forces_reevaluation() {
        let cache = DecisionCache::new(DecisionCacheConfig::default()).unwrap();
        let key = DecisionKey::derive("authz", "allow", b"{}");
        let token = CancelToken::new();

        cache
            .decide(&token, &key, |_, _| Ok::<_, String>(Verdict::Allow))
            .unwrap();
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        let verdict = cache
            .decide(&token, &key, |_, _| Ok::<_, String>(Verdict::Deny))
            .unwrap();
        assert_eq!(verdict, Verdict::Deny);
    }

    #[test]
    fn failed_evaluation_is_not_cached() {
        let cache = DecisionCache::new(DecisionCacheConfig::default()).unwrap();
        let key = DecisionKey::derive("authz", "allow", b"{}");
        let token = CancelToken::new();

        let err = cache
            .decide(&token, &key, |_, _| Err::<Verdict, _>("undefined rule".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "undefined rule");
        assert_eq!(cache.cached(&key), None);
        assert!(cache.cache().is_empty());
    }

    #[test]
    fn zero_ttl_evaluates_every_time() {
        let config = DecisionCacheConfig {
            capacity: 4,
            ttl: Duration::ZERO,
        };
        let cache = DecisionCache::new(config).unwrap();
        let key = DecisionKey::derive("m", "e", b"x");
        let token = CancelToken::new();
        let evaluations = Cell::new(0);
        for _ in 0..3 {
            cache
                .decide(&token, &key, |_, _| {
                    evaluations.set(evaluations.get() + 1);
                    Ok::<_, String>(Verdict::Allow)
                })
                .unwrap();
        }
        assert_eq!(evaluations.get(), 3);
        assert_eq!(cache.ttl(), Duration::ZERO);
    }
}
