//! Projects upcoming obligations into a time-ordered forecast.
//!
//! The builder pulls active recurring obligations and pending reminders from
//! the obligation store, expands recurring schedules through the recurrence
//! engine, and aggregates the merged occurrence list into daily and
//! cumulative totals.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use model::entities::{Obligation, ObligationKind, RecurrenceRule};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::recurrence::{expand_occurrences, month_bounds};
use crate::store::ObligationStore;

/// A single projected occurrence: one future bill payment or reminder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastItem {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub category_id: i64,
    pub kind: ObligationKind,
    pub obligation_id: i64,
}

/// Running totals per calendar day, in date order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCumulative {
    pub date: NaiveDate,
    /// Sum of all occurrences on this day.
    pub total: Decimal,
    /// Sum of all occurrences up to and including this day.
    pub running_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total_amount: Decimal,
    pub recurring_count: usize,
    pub reminder_count: usize,
}

/// The full forecast over a window: ordered items, per-day totals keyed by
/// calendar date, cumulative totals and a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastData {
    pub items: Vec<ForecastItem>,
    pub daily_totals: BTreeMap<NaiveDate, Decimal>,
    pub cumulative: Vec<DailyCumulative>,
    pub summary: ForecastSummary,
}

/// Totals for a single calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthForecast {
    pub total_amount: Decimal,
    pub bill_count: usize,
    pub reminder_count: usize,
}

/// Builds obligation forecasts relative to an explicitly injected "today".
///
/// The reference date is a constructor argument rather than an ambient clock
/// read, so behavior is deterministic under test and timezone-defined in
/// production.
#[derive(Clone)]
pub struct ForecastBuilder {
    obligations: Arc<dyn ObligationStore>,
    today: NaiveDate,
}

impl ForecastBuilder {
    pub fn new(obligations: Arc<dyn ObligationStore>, today: NaiveDate) -> Self {
        Self { obligations, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Builds the forecast over `[today, today + window_days]`.
    #[instrument(skip(self), fields(today = %self.today))]
    pub async fn build_forecast(
        &self,
        scope: Option<i64>,
        window_days: i64,
    ) -> Result<ForecastData> {
        let window_start = self.today;
        let window_end = self.today + Duration::days(window_days);

        let recurring = self.obligations.active_recurring(scope).await?;
        let reminders = self
            .obligations
            .pending_reminders(scope, window_start, window_end)
            .await?;
        debug!(
            recurring = recurring.len(),
            reminders = reminders.len(),
            "loaded obligations"
        );

        let mut items = Vec::new();
        for obligation in &recurring {
            let Some((rule, anchor)) = schedule_of(obligation) else {
                debug!(
                    obligation = obligation.id,
                    "recurring obligation without a schedule, skipping"
                );
                continue;
            };
            let end = obligation
                .series_end_date
                .map_or(window_end, |series_end| series_end.min(window_end));
            for date in expand_occurrences(&rule, anchor, window_start, end) {
                items.push(ForecastItem {
                    date,
                    amount: obligation.amount,
                    description: obligation.description.clone(),
                    category_id: obligation.category_id,
                    kind: ObligationKind::Recurring,
                    obligation_id: obligation.id,
                });
            }
        }

        for reminder in &reminders {
            let Some(date) = reminder.occurrence_date else {
                continue;
            };
            items.push(ForecastItem {
                date,
                amount: reminder.amount,
                description: reminder.description.clone(),
                category_id: reminder.category_id,
                kind: ObligationKind::Reminder,
                obligation_id: reminder.id,
            });
        }

        // Stable sort: same-day items keep their original relative order.
        items.sort_by_key(|item| item.date);

        let mut daily_totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for item in &items {
            *daily_totals.entry(item.date).or_insert(Decimal::ZERO) += item.amount;
        }

        let mut cumulative = Vec::with_capacity(daily_totals.len());
        let mut running_total = Decimal::ZERO;
        for (&date, &total) in &daily_totals {
            running_total += total;
            cumulative.push(DailyCumulative {
                date,
                total,
                running_total,
            });
        }

        let recurring_count = items
            .iter()
            .filter(|item| item.kind == ObligationKind::Recurring)
            .count();
        let summary = ForecastSummary {
            total_amount: running_total,
            recurring_count,
            reminder_count: items.len() - recurring_count,
        };

        info!(
            items = items.len(),
            total = %summary.total_amount,
            "forecast built"
        );
        Ok(ForecastData {
            items,
            daily_totals,
            cumulative,
            summary,
        })
    }

    /// Builds the forecast totals for one calendar month.
    ///
    /// Combines obligations already due in the month with still-projected
    /// occurrences dated from `max(today, month start)` onward. The `max` is
    /// load-bearing: a projected occurrence earlier than today has already
    /// surfaced as a due ledger entry and must not be counted twice.
    #[instrument(skip(self), fields(today = %self.today))]
    pub async fn build_month_forecast(
        &self,
        scope: Option<i64>,
        month: u32,
        year: i32,
        category_filter: Option<i64>,
    ) -> Result<MonthForecast> {
        let (month_start, month_end) = month_bounds(year, month);

        let mut total_amount = Decimal::ZERO;
        let mut bill_count = 0usize;
        let mut reminder_count = 0usize;

        let due = self
            .obligations
            .due_unsettled(scope, month_start, month_end)
            .await?;
        for obligation in due.iter().filter(|o| in_category(o, category_filter)) {
            total_amount += obligation.amount;
            match obligation.kind {
                ObligationKind::Recurring => bill_count += 1,
                ObligationKind::Reminder => reminder_count += 1,
            }
        }

        let projected_start = self.today.max(month_start);
        if projected_start <= month_end {
            let recurring = self.obligations.active_recurring(scope).await?;
            for obligation in recurring.iter().filter(|o| in_category(o, category_filter)) {
                let Some((rule, anchor)) = schedule_of(obligation) else {
                    continue;
                };
                let end = obligation
                    .series_end_date
                    .map_or(month_end, |series_end| series_end.min(month_end));
                let occurrences = expand_occurrences(&rule, anchor, projected_start, end).len();
                bill_count += occurrences;
                total_amount += obligation.amount * Decimal::from(occurrences as i64);
            }

            let reminders = self
                .obligations
                .pending_reminders(scope, projected_start, month_end)
                .await?;
            for reminder in reminders
                .iter()
                .filter(|r| r.is_projected && in_category(r, category_filter))
            {
                total_amount += reminder.amount;
                reminder_count += 1;
            }
        }

        debug!(
            %total_amount,
            bill_count,
            reminder_count,
            "month forecast built"
        );
        Ok(MonthForecast {
            total_amount,
            bill_count,
            reminder_count,
        })
    }
}

fn schedule_of(obligation: &Obligation) -> Option<(RecurrenceRule, NaiveDate)> {
    match (obligation.recurrence, obligation.next_due_date) {
        (Some(rule), Some(anchor)) => Some((rule, anchor)),
        _ => None,
    }
}

fn in_category(obligation: &Obligation, filter: Option<i64>) -> bool {
    filter.is_none_or(|category_id| obligation.category_id == category_id)
}
