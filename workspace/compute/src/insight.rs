//! Natural-language spending insights, selected by where we are in the
//! month.
//!
//! The engine classifies the injected "today" into a phase, computes the
//! phase's structured insight from the aggregator and resolver, asks the
//! external formatter to phrase it (falling back to built-in templates), and
//! memoizes the result per `(scope, month, year, phase)`.
//!
//! This is the single layer that downgrades upstream failures into a
//! graceful "nothing to show": it sits directly under a user-facing display
//! surface where a missing insight beats a broken page. Lower components
//! propagate their errors unchanged.

pub mod cache;
mod end_of_month;
mod mid_month;
pub mod render;
mod start_of_month;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use model::entities::{InsightData, InsightEntry, InsightKey, InsightPhase};
use rusty_money::iso;
use tracing::{debug, info, instrument, warn};

use crate::budget::BudgetResolver;
use crate::error::Result;
use crate::forecast::{ForecastBuilder, MonthForecast};
use crate::insight::cache::InsightCacheStore;
use crate::stats::StatsAggregator;
use crate::store::TextFormatter;

/// The current month's dashboard read: projected obligations plus the
/// phase-appropriate insight.
#[derive(Debug, Clone)]
pub struct MonthOutlook {
    pub forecast: MonthForecast,
    pub insight: Option<InsightEntry>,
}

pub struct InsightEngine {
    stats: StatsAggregator,
    forecast: ForecastBuilder,
    resolver: BudgetResolver,
    cache: Arc<dyn InsightCacheStore>,
    formatter: Option<Arc<dyn TextFormatter>>,
    currency: &'static iso::Currency,
    today: NaiveDate,
}

impl InsightEngine {
    pub fn new(
        stats: StatsAggregator,
        forecast: ForecastBuilder,
        resolver: BudgetResolver,
        cache: Arc<dyn InsightCacheStore>,
        today: NaiveDate,
    ) -> Self {
        Self {
            stats,
            forecast,
            resolver,
            cache,
            formatter: None,
            currency: iso::USD,
            today,
        }
    }

    /// Attaches the external text formatter. Without one, the built-in
    /// templates render all text.
    pub fn with_formatter(mut self, formatter: Arc<dyn TextFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Sets the display currency for the fallback templates.
    pub fn with_currency(mut self, currency: &'static iso::Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Computes (or returns the cached) insight for a scope and month.
    ///
    /// Only the engine's current month yields an insight; any other month
    /// returns `None`, as do upstream fetch failures.
    #[instrument(skip(self), fields(today = %self.today))]
    pub async fn monthly_insight(
        &self,
        scope: Option<i64>,
        month: u32,
        year: i32,
    ) -> Result<Option<InsightEntry>> {
        if month != self.today.month() || year != self.today.year() {
            debug!("insight requested outside the current month");
            return Ok(None);
        }

        let phase = InsightPhase::for_day(self.today.day());
        let key = InsightKey {
            scope,
            month,
            year,
            phase,
        };

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                debug!(?phase, "insight served from cache");
                return Ok(Some(entry));
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "insight cache read failed, recomputing"),
        }

        let data = match self.compute_phase(phase, scope).await {
            Ok(data) => data,
            Err(err) => {
                // A missing insight beats a broken page.
                warn!(%err, ?phase, "insight computation failed");
                return Ok(None);
            }
        };

        let text = self.render_text(&data).await;
        let entry = InsightEntry {
            data,
            text,
            generated_at: Utc::now(),
        };

        // Concurrent requests for the same uncached key may both land here;
        // the write is idempotent and last-write-wins is acceptable.
        if let Err(err) = self.cache.put(key, entry.clone()).await {
            warn!(%err, "insight cache write failed");
        }

        info!(?phase, "insight computed");
        Ok(Some(entry))
    }

    /// The current month's obligations forecast paired with its insight.
    pub async fn month_outlook(&self, scope: Option<i64>) -> Result<MonthOutlook> {
        let (month, year) = (self.today.month(), self.today.year());
        let forecast = self
            .forecast
            .build_month_forecast(scope, month, year, None)
            .await?;
        let insight = self.monthly_insight(scope, month, year).await?;
        Ok(MonthOutlook { forecast, insight })
    }

    /// Drops every cached insight for the month. Mutation handlers call
    /// this for each month an expense or budget change touches.
    pub async fn invalidate(&self, month: u32, year: i32) -> Result<()> {
        self.cache.invalidate(month, year).await
    }

    async fn compute_phase(&self, phase: InsightPhase, scope: Option<i64>) -> Result<InsightData> {
        match phase {
            InsightPhase::StartOfMonth => {
                start_of_month::compute(&self.stats, &self.resolver, scope, self.today).await
            }
            InsightPhase::MidMonth => {
                mid_month::compute(&self.stats, &self.resolver, scope, self.today).await
            }
            InsightPhase::EndOfMonth => {
                end_of_month::compute(&self.stats, scope, self.today).await
            }
        }
    }

    async fn render_text(&self, data: &InsightData) -> String {
        if let Some(formatter) = &self.formatter {
            match formatter.render(data).await {
                Ok(text) => return text,
                Err(err) => {
                    warn!(%err, "text formatter unavailable, using fallback template")
                }
            }
        }
        render::fallback_text(data, self.currency)
    }
}
