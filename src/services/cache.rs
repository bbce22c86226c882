//! Per-candidate recommendation cache.
//!
//! Entries are keyed by `(candidate_id, limit)` and stored as `Arc`s in a
//! bounded `moka` cache, so a refresh swaps the whole entry and readers never
//! take a lock. Expiry is checked lazily against an injectable [`Clock`].
//!
//! Misses on the same key are serialized through a per-key async mutex: the
//! first caller computes, the others wait and then pick up the stored entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::EngineError;
use crate::models::Recommendations;
use crate::services::engine::Recommender;

/// Source of the current time for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic expiry
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub candidate_id: String,
    pub limit: usize,
}

/// Immutable snapshot of one computed result set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub candidate_id: String,
    pub limit: usize,
    pub recommendations: Arc<Recommendations>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    generation: u64,
}

impl CacheEntry {
    #[inline]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Entry returned by [`RecommendationCache::get`]
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: Arc<CacheEntry>,
    /// True when served without running a computation for this call
    pub hit: bool,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub hit_rate: f64,
}

pub struct RecommendationCache {
    recommender: Arc<dyn Recommender>,
    clock: Arc<dyn Clock>,
    entries: moka::future::Cache<CacheKey, Arc<CacheEntry>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    ttl: chrono::Duration,
    max_limit: usize,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl RecommendationCache {
    pub fn new(recommender: Arc<dyn Recommender>, ttl: std::time::Duration, capacity: u64) -> Self {
        Self::with_clock(recommender, Arc::new(SystemClock), ttl, capacity)
    }

    pub fn with_clock(
        recommender: Arc<dyn Recommender>,
        clock: Arc<dyn Clock>,
        ttl: std::time::Duration,
        capacity: u64,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            recommender,
            clock,
            entries: moka::future::CacheBuilder::new(capacity).build(),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
            max_limit: 20,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Upper bound applied to requested limits before keying
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit.max(1);
        self
    }

    /// Return cached recommendations, computing them on a miss or when forced
    pub async fn get(
        &self,
        candidate_id: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Result<CacheLookup, EngineError> {
        let key = CacheKey {
            candidate_id: candidate_id.to_string(),
            limit: limit.clamp(1, self.max_limit),
        };

        if !force_refresh {
            if let Some(entry) = self.fresh_entry(&key).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache hit: {}:{}", key.candidate_id, key.limit);
                return Ok(CacheLookup { entry, hit: true });
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let seen_generation = self.generation.load(Ordering::Acquire);

        // Released on drop, so a cancelled caller does not leak the key
        let lease = self.lease_key(&key);
        self.compute_locked(&key, &lease.lock, force_refresh, seen_generation)
            .await
    }

    async fn compute_locked(
        &self,
        key: &CacheKey,
        lock: &tokio::sync::Mutex<()>,
        force_refresh: bool,
        seen_generation: u64,
    ) -> Result<CacheLookup, EngineError> {
        let _guard = lock.lock().await;

        // Another caller may have stored a result while we waited
        if let Some(entry) = self.fresh_entry(key).await {
            if !force_refresh || entry.generation > seen_generation {
                tracing::trace!("Coalesced cache fill: {}:{}", key.candidate_id, key.limit);
                return Ok(CacheLookup { entry, hit: true });
            }
        }

        tracing::debug!("Computing recommendations: {}:{}", key.candidate_id, key.limit);
        self.computations.fetch_add(1, Ordering::Relaxed);
        let recommendations = self.recommender.recommend(&key.candidate_id, key.limit).await?;

        let computed_at = self.clock.now();
        let entry = Arc::new(CacheEntry {
            candidate_id: key.candidate_id.clone(),
            limit: key.limit,
            recommendations,
            computed_at,
            expires_at: computed_at.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            generation: self.generation.fetch_add(1, Ordering::AcqRel) + 1,
        });
        self.entries.insert(key.clone(), Arc::clone(&entry)).await;

        Ok(CacheLookup { entry, hit: false })
    }

    async fn fresh_entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries
            .get(key)
            .await
            .filter(|entry| entry.is_fresh(self.clock.now()))
    }

    fn lease_key(&self, key: &CacheKey) -> KeyLease<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(in_flight.entry(key.clone()).or_default());
        KeyLease {
            cache: self,
            key: key.clone(),
            lock,
        }
    }

    fn release_key(&self, key: &CacheKey, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Registry plus this caller: nobody else is waiting on the key
        if Arc::strong_count(lock) <= 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_keys(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every cached limit variant for a candidate
    pub async fn invalidate(&self, candidate_id: &str) -> usize {
        let keys: Vec<Arc<CacheKey>> = self
            .entries
            .iter()
            .filter(|(key, _)| key.candidate_id == candidate_id)
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.entries.invalidate(key.as_ref()).await;
        }

        tracing::debug!("Invalidated {} cache entries for {}", keys.len(), candidate_id);
        keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            entries: self.entries.entry_count(),
            hits,
            misses,
            computations: self.computations.load(Ordering::Relaxed),
            hit_rate: if lookups > 0 { hits as f64 / lookups as f64 } else { 0.0 },
        }
    }
}

/// Caller's handle on a key's miss lock
struct KeyLease<'a> {
    cache: &'a RecommendationCache,
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        self.cache.release_key(&self.key, &self.lock);
    }
}

#[async_trait]
impl Recommender for RecommendationCache {
    async fn recommend(
        &self,
        candidate_id: &str,
        limit: usize,
    ) -> Result<Arc<Recommendations>, EngineError> {
        let lookup = self.get(candidate_id, limit, false).await?;
        Ok(Arc::clone(&lookup.entry.recommendations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use chrono::TimeZone;

    /// Counts calls and returns one fake match per call, numbered
    struct CountingRecommender {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingRecommender {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Recommender for CountingRecommender {
        async fn recommend(
            &self,
            candidate_id: &str,
            _limit: usize,
        ) -> Result<Arc<Recommendations>, EngineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if candidate_id == "missing" {
                return Err(EngineError::CandidateNotFound(candidate_id.to_string()));
            }
            Ok(Arc::new(Recommendations {
                candidate_id: candidate_id.to_string(),
                matches: vec![],
                total_considered: call,
                reason: None,
            }))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn build(delay: Duration) -> (Arc<CountingRecommender>, Arc<ManualClock>, RecommendationCache) {
        let recommender = Arc::new(CountingRecommender::new(delay));
        let clock = Arc::new(ManualClock::new(start()));
        let cache = RecommendationCache::with_clock(
            recommender.clone(),
            clock.clone(),
            Duration::from_secs(300),
            100,
        );
        (recommender, clock, cache)
    }

    #[tokio::test]
    async fn test_second_get_within_ttl_is_cached() {
        let (recommender, _clock, cache) = build(Duration::ZERO);

        let first = cache.get("c1", 5, false).await.unwrap();
        let second = cache.get("c1", 5, false).await.unwrap();

        assert!(!first.hit);
        assert!(second.hit);
        assert_eq!(first.entry.recommendations, second.entry.recommendations);
        assert_eq!(recommender.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputed() {
        let (recommender, clock, cache) = build(Duration::ZERO);

        cache.get("c1", 5, false).await.unwrap();
        clock.advance(chrono::Duration::seconds(299));
        assert!(cache.get("c1", 5, false).await.unwrap().hit);

        clock.advance(chrono::Duration::seconds(1));
        let refreshed = cache.get("c1", 5, false).await.unwrap();

        assert!(!refreshed.hit);
        assert_eq!(refreshed.entry.computed_at, start() + chrono::Duration::seconds(300));
        assert_eq!(recommender.calls(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_recomputes() {
        let (recommender, _clock, cache) = build(Duration::ZERO);

        cache.get("c1", 5, false).await.unwrap();
        let forced = cache.get("c1", 5, true).await.unwrap();

        assert!(!forced.hit);
        assert_eq!(forced.entry.recommendations.total_considered, 2);
        assert_eq!(recommender.calls(), 2);
    }

    #[tokio::test]
    async fn test_keys_include_limit() {
        let (recommender, _clock, cache) = build(Duration::ZERO);

        cache.get("c1", 5, false).await.unwrap();
        cache.get("c1", 10, false).await.unwrap();
        // Clamped onto the same key as 20
        cache.get("c1", 50, false).await.unwrap();
        cache.get("c1", 20, false).await.unwrap();

        assert_eq!(recommender.calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let (recommender, _clock, cache) = build(Duration::from_millis(50));
        let cache = Arc::new(cache);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.get("c1", 5, false).await });
        }

        let mut entries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            entries.push(joined.unwrap().unwrap().entry);
        }

        assert_eq!(recommender.calls(), 1);
        assert!(entries.iter().all(|entry| Arc::ptr_eq(entry, &entries[0])));
        assert_eq!(cache.stats().computations, 1);
    }

    #[tokio::test]
    async fn test_concurrent_forced_refreshes_coalesce() {
        let (recommender, _clock, cache) = build(Duration::from_millis(50));

        cache.get("c1", 5, false).await.unwrap();
        let (a, b) = tokio::join!(cache.get("c1", 5, true), cache.get("c1", 5, true));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(recommender.calls(), 2);
        assert!(Arc::ptr_eq(&a.entry, &b.entry));
        assert_ne!(a.hit, b.hit);

        // A later forced call still recomputes
        let later = cache.get("c1", 5, true).await.unwrap();
        assert!(!later.hit);
        assert_eq!(recommender.calls(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_get_releases_key() {
        let (recommender, _clock, cache) = build(Duration::from_millis(200));

        let timed_out = tokio::time::timeout(Duration::from_millis(20), cache.get("c1", 5, false)).await;
        assert!(timed_out.is_err());
        assert_eq!(recommender.calls(), 1);
        assert_eq!(cache.in_flight_keys(), 0);

        cache.get("c2", 5, false).await.unwrap();
        assert_eq!(cache.in_flight_keys(), 0);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let (recommender, _clock, cache) = build(Duration::ZERO);

        assert!(cache.get("missing", 5, false).await.is_err());
        assert!(cache.get("missing", 5, false).await.is_err());

        assert_eq!(recommender.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_all_limits() {
        let (recommender, _clock, cache) = build(Duration::ZERO);

        cache.get("c1", 5, false).await.unwrap();
        cache.get("c1", 10, false).await.unwrap();
        cache.get("c2", 5, false).await.unwrap();

        assert_eq!(cache.invalidate("c1").await, 2);
        assert!(!cache.get("c1", 5, false).await.unwrap().hit);
        assert!(cache.get("c2", 5, false).await.unwrap().hit);
        assert_eq!(recommender.calls(), 4);
    }
}
