//! Bounded, expiring memo of generated changelogs.
//!
//! Keys are fingerprints of the generation inputs. Entries expire after a TTL
//! and the least-recently-used entry is evicted when the cache is full.
//! Expiry uses `tokio::time::Instant`, so a paused test clock controls it.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

use crate::config::Settings;

/// Deterministic hash of the inputs that decide a changelog's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

#[derive(Serialize)]
struct FingerprintInput<'a> {
    shas: &'a [&'a str],
    format: &'a str,
    version: Option<&'a str>,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<&'a str>,
}

impl Fingerprint {
    /// Hash the ordered commit SHAs, format id, version and output language.
    ///
    /// SHA order is significant: the same commits in a different order are a
    /// different request.
    pub fn compute(shas: &[&str], format: &str, version: Option<&str>, language: &str) -> Self {
        Self::hash(&FingerprintInput {
            shas,
            format,
            version,
            language,
            template: None,
        })
    }

    /// Fold custom template text into the key. `None` leaves it unchanged.
    pub fn with_template(self, template: Option<&str>) -> Self {
        match template {
            Some(template) => Self::hash(&FingerprintInput {
                shas: &[self.0.as_str()],
                format: "custom",
                version: None,
                language: "",
                template: Some(template),
            }),
            None => self,
        }
    }

    fn hash(input: &FingerprintInput<'_>) -> Self {
        // Serializing borrowed strings and options cannot fail.
        let encoded = serde_json::to_vec(input).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stand-in expiry for TTLs too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local changelog cache. Share it through an `Arc`.
pub struct GenerationCache {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
    ttl: Duration,
}

impl GenerationCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.cache_capacity, settings.cache_ttl)
    }

    /// The TTL applied by [`GenerationCache::insert`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a fresh entry, refreshing its recency. Expired entries are
    /// dropped and reported as misses.
    pub fn get(&self, key: &Fingerprint) -> Option<String> {
        let mut entries = self.lock();
        let now = Instant::now();

        match entries.get(key) {
            None => return None,
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => {}
        }

        debug!(key = %key, "Dropping expired cache entry");
        entries.pop(key);
        None
    }

    /// Store a value with the default TTL.
    pub fn insert(&self, key: Fingerprint, value: String) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Store a value with an explicit TTL, evicting the least-recently-used
    /// entry when the cache is full.
    pub fn insert_with_ttl(&self, key: Fingerprint, value: String, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
        };
        if let Some((evicted, _)) = self.lock().push(key.clone(), entry)
            && evicted != key
        {
            debug!(key = %evicted, "Evicted least-recently-used cache entry");
        }
    }

    pub fn remove(&self, key: &Fingerprint) -> Option<String> {
        self.lock().pop(key).map(|e| e.value)
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, CacheEntry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for GenerationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
