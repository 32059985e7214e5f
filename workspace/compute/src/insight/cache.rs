//! Keyed memoization of computed insights.
//!
//! At most one entry exists per `(scope, month, year, phase)`; `put` has
//! upsert semantics. Invalidation removes every entry of a month at once,
//! regardless of scope and phase, because any expense or budget mutation in
//! that month can change any of its insights. The get-compute-put sequence
//! is deliberately not atomic: concurrent requests for the same uncached key
//! may both compute and both write, which is idempotent, so last-write-wins
//! is safe.

use async_trait::async_trait;
use model::entities::{InsightEntry, InsightKey};
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};

/// The cache store collaborator.
///
/// The host application may back this with any keyed store that supports
/// bulk removal by month; [`MemoryInsightCache`] is the in-process default.
#[async_trait]
pub trait InsightCacheStore: Send + Sync {
    async fn get(&self, key: &InsightKey) -> Result<Option<InsightEntry>>;

    /// Upserts the entry under its natural unique key.
    async fn put(&self, key: InsightKey, entry: InsightEntry) -> Result<()>;

    /// Removes all entries for the month, across scopes and phases.
    ///
    /// Mutation handlers (expense create/update/delete/settle, budget
    /// changes) must call this for every month they touch.
    async fn invalidate(&self, month: u32, year: i32) -> Result<()>;
}

/// In-memory cache store backed by moka, with predicate invalidation for
/// the bulk month removal.
pub struct MemoryInsightCache {
    inner: moka::future::Cache<InsightKey, InsightEntry>,
}

impl MemoryInsightCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .max_capacity(max_capacity)
                .support_invalidation_closures()
                .build(),
        }
    }

    /// A cache sized for a handful of household members across a year of
    /// months and three phases.
    pub fn with_defaults() -> Self {
        Self::new(1024)
    }
}

impl Default for MemoryInsightCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl InsightCacheStore for MemoryInsightCache {
    async fn get(&self, key: &InsightKey) -> Result<Option<InsightEntry>> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: InsightKey, entry: InsightEntry) -> Result<()> {
        self.inner.insert(key, entry).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate(&self, month: u32, year: i32) -> Result<()> {
        self.inner
            .invalidate_entries_if(move |key, _| key.month == month && key.year == year)
            .map_err(|err| ComputeError::Cache(err.to_string()))?;
        debug!("invalidated cached insights for month");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::entities::{InsightData, InsightPhase, MonthOverMonth};
    use rust_decimal::Decimal;

    fn entry(text: &str) -> InsightEntry {
        InsightEntry {
            data: InsightData::MonthOverMonth(MonthOverMonth {
                current_to_date: Decimal::from(10),
                previous_to_date: Decimal::from(5),
                delta: Decimal::from(5),
                delta_pct: Some(100.0),
                is_ahead: true,
            }),
            text: text.to_string(),
            generated_at: Utc::now(),
        }
    }

    fn key(scope: Option<i64>, month: u32, phase: InsightPhase) -> InsightKey {
        InsightKey {
            scope,
            month,
            year: 2024,
            phase,
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_the_written_entry() {
        let cache = MemoryInsightCache::with_defaults();
        let k = key(Some(1), 6, InsightPhase::MidMonth);

        assert!(cache.get(&k).await.unwrap().is_none());
        cache.put(k, entry("first")).await.unwrap();
        assert_eq!(cache.get(&k).await.unwrap().unwrap().text, "first");

        // Upsert semantics: a second put overwrites.
        cache.put(k, entry("second")).await.unwrap();
        assert_eq!(cache.get(&k).await.unwrap().unwrap().text, "second");
    }

    #[tokio::test]
    async fn scoped_and_unscoped_keys_are_distinct() {
        let cache = MemoryInsightCache::with_defaults();
        cache
            .put(key(Some(1), 6, InsightPhase::MidMonth), entry("user"))
            .await
            .unwrap();
        cache
            .put(key(None, 6, InsightPhase::MidMonth), entry("household"))
            .await
            .unwrap();

        assert_eq!(
            cache
                .get(&key(Some(1), 6, InsightPhase::MidMonth))
                .await
                .unwrap()
                .unwrap()
                .text,
            "user"
        );
        assert_eq!(
            cache
                .get(&key(None, 6, InsightPhase::MidMonth))
                .await
                .unwrap()
                .unwrap()
                .text,
            "household"
        );
    }

    #[tokio::test]
    async fn invalidation_clears_the_whole_month_only() {
        let cache = MemoryInsightCache::with_defaults();
        cache
            .put(key(Some(1), 6, InsightPhase::StartOfMonth), entry("a"))
            .await
            .unwrap();
        cache
            .put(key(None, 6, InsightPhase::EndOfMonth), entry("b"))
            .await
            .unwrap();
        cache
            .put(key(Some(1), 7, InsightPhase::MidMonth), entry("keep"))
            .await
            .unwrap();

        cache.invalidate(6, 2024).await.unwrap();

        assert!(cache
            .get(&key(Some(1), 6, InsightPhase::StartOfMonth))
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .get(&key(None, 6, InsightPhase::EndOfMonth))
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            cache
                .get(&key(Some(1), 7, InsightPhase::MidMonth))
                .await
                .unwrap()
                .unwrap()
                .text,
            "keep"
        );
    }
}
