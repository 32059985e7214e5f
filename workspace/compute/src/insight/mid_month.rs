//! Mid-month insight: four candidate analyses computed over the same
//! snapshot, picked by priority.
//!
//! Candidates: burn-rate pace alert, per-category anomaly detection,
//! month-over-month progress, and rolling-window category profiles. A pace
//! alert that is over budget trumps everything; otherwise anomalies, then a
//! month-over-month overshoot, then notable category profiles, then the
//! pace summary as the default.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use model::entities::{
    Anomalies, CategoryAnomaly, CategoryInsights, CategoryProfile, InsightData, MonthOverMonth,
    PaceAlert, VolatilityBand,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::try_join;
use tracing::debug;

use crate::budget::BudgetResolver;
use crate::error::Result;
use crate::recurrence::{days_in_month, month_bounds, months_back};
use crate::stats::{MonthlyStats, StatsAggregator};

/// Flag a category when its projection deviates more than this from its
/// three-month mean.
const ANOMALY_THRESHOLD_PCT: f64 = 30.0;
/// Coefficient-of-variation bands for category stability.
const STABLE_CV_PCT: f64 = 15.0;
const VOLATILE_CV_PCT: f64 = 50.0;
/// Increase of the recent three months over the prior three that counts as
/// trending up.
const TREND_THRESHOLD_PCT: f64 = 15.0;
/// Budget consumption band that counts as approaching the limit.
const APPROACHING_LIMIT_LOW_PCT: f64 = 75.0;
const APPROACHING_LIMIT_HIGH_PCT: f64 = 100.0;

pub(crate) async fn compute(
    stats: &StatsAggregator,
    resolver: &BudgetResolver,
    scope: Option<i64>,
    today: NaiveDate,
) -> Result<InsightData> {
    let (year, month) = (today.year(), today.month());
    let day = today.day();
    let total_days = days_in_month(year, month);
    let (month_start, _) = month_bounds(year, month);

    // Last month's window cut at the same day of month, clamped to its end.
    let (prev_year, prev_month) = months_back(year, month, 1);
    let (prev_start, prev_month_end) = month_bounds(prev_year, prev_month);
    let prev_cut = (prev_start + Duration::days((day - 1) as i64)).min(prev_month_end);

    let back = |n: u32| months_back(year, month, n);
    let ((y1, m1), (y2, m2), (y3, m3), (y4, m4), (y5, m5), (y6, m6)) =
        (back(1), back(2), back(3), back(4), back(5), back(6));

    // All historical windows are independent reads; fan out and join.
    let (current, prev_partial, h1, h2, h3, h4, h5, h6) = try_join!(
        stats.compute_range(scope, month_start, today, false, None),
        stats.compute_range(scope, prev_start, prev_cut, false, None),
        stats.compute_stats(scope, m1, y1, false, None),
        stats.compute_stats(scope, m2, y2, false, None),
        stats.compute_stats(scope, m3, y3, false, None),
        stats.compute_stats(scope, m4, y4, false, None),
        stats.compute_stats(scope, m5, y5, false, None),
        stats.compute_stats(scope, m6, y6, false, None),
    )?;

    let pace = pace_alert(resolver, scope, &current, day, total_days, year, month).await?;
    let anomalies = detect_anomalies(&current, [&h1, &h2, &h3], day, total_days);
    let progress = month_over_month(&current, &prev_partial);
    let profiles = category_profiles(&current, [&h1, &h2, &h3, &h4, &h5, &h6]);

    debug!(
        pace_over = pace.is_over_budget,
        anomalies = anomalies.len(),
        ahead = progress.is_ahead,
        profiles = profiles.len(),
        "mid-month candidates computed"
    );

    if pace.is_over_budget {
        return Ok(InsightData::PaceAlert(pace));
    }
    if !anomalies.is_empty() {
        return Ok(InsightData::Anomalies(Anomalies { anomalies }));
    }
    if progress.is_ahead {
        return Ok(InsightData::MonthOverMonth(progress));
    }
    if !profiles.is_empty() {
        return Ok(InsightData::CategoryInsights(CategoryInsights {
            categories: profiles,
        }));
    }
    Ok(InsightData::PaceAlert(pace))
}

async fn pace_alert(
    resolver: &BudgetResolver,
    scope: Option<i64>,
    current: &MonthlyStats,
    day: u32,
    total_days: u32,
    year: i32,
    month: u32,
) -> Result<PaceAlert> {
    let days_elapsed = day.max(1);
    let days_remaining = total_days - days_elapsed.min(total_days);

    let spent_so_far = current.total;
    let daily_average = spent_so_far / Decimal::from(days_elapsed);
    let projected_total = daily_average * Decimal::from(total_days);

    let budget = resolver.monthly_budget(scope, month, year).await?;
    let carryover = resolver.carryover(scope, month, year).await?;
    let effective_budget = budget - carryover;

    let is_over_budget = projected_total > effective_budget;
    let over_by = (projected_total - effective_budget).max(Decimal::ZERO);
    let daily_target = (days_remaining > 0).then(|| {
        ((effective_budget - spent_so_far) / Decimal::from(days_remaining)).max(Decimal::ZERO)
    });

    Ok(PaceAlert {
        spent_so_far,
        daily_average,
        projected_total,
        effective_budget,
        carryover,
        is_over_budget,
        over_by,
        daily_target,
        days_elapsed,
        days_remaining,
    })
}

fn amounts_by_category(stats: &MonthlyStats) -> HashMap<i64, Decimal> {
    stats
        .by_category
        .iter()
        .map(|bucket| (bucket.category_id, bucket.amount))
        .collect()
}

fn detect_anomalies(
    current: &MonthlyStats,
    history: [&MonthlyStats; 3],
    day: u32,
    total_days: u32,
) -> Vec<CategoryAnomaly> {
    let history: Vec<HashMap<i64, Decimal>> =
        history.iter().map(|h| amounts_by_category(h)).collect();

    let mut anomalies = Vec::new();
    for bucket in &current.by_category {
        let mean: Decimal = history
            .iter()
            .map(|h| h.get(&bucket.category_id).copied().unwrap_or(Decimal::ZERO))
            .sum::<Decimal>()
            / Decimal::from(3);
        if mean.is_zero() {
            // Nothing to deviate from; a brand-new category is not an
            // anomaly in this sense.
            continue;
        }

        let projected = bucket.amount / Decimal::from(day.max(1)) * Decimal::from(total_days);
        let deviation_pct = ((projected - mean) / mean * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0);
        if deviation_pct.abs() > ANOMALY_THRESHOLD_PCT {
            anomalies.push(CategoryAnomaly {
                category_id: bucket.category_id,
                category_name: bucket.category_name.clone(),
                current_amount: bucket.amount,
                projected_amount: projected,
                historical_mean: mean,
                deviation_pct,
            });
        }
    }

    anomalies.sort_by(|a, b| {
        b.deviation_pct
            .abs()
            .partial_cmp(&a.deviation_pct.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    anomalies
}

fn month_over_month(current: &MonthlyStats, previous_partial: &MonthlyStats) -> MonthOverMonth {
    let delta = current.total - previous_partial.total;
    let delta_pct = (!previous_partial.total.is_zero()).then(|| {
        (delta / previous_partial.total * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0)
    });
    MonthOverMonth {
        current_to_date: current.total,
        previous_to_date: previous_partial.total,
        delta,
        delta_pct,
        is_ahead: current.total > previous_partial.total,
    }
}

fn category_profiles(current: &MonthlyStats, window: [&MonthlyStats; 6]) -> Vec<CategoryProfile> {
    let months: Vec<HashMap<i64, Decimal>> =
        window.iter().map(|m| amounts_by_category(m)).collect();

    let mut names: HashMap<i64, String> = HashMap::new();
    let mut category_ids = BTreeSet::new();
    for stats in window.iter().chain(std::iter::once(&current)) {
        for bucket in &stats.by_category {
            category_ids.insert(bucket.category_id);
            names
                .entry(bucket.category_id)
                .or_insert_with(|| bucket.category_name.clone());
        }
    }

    let current_buckets: HashMap<i64, (Decimal, Option<Decimal>)> = current
        .by_category
        .iter()
        .map(|bucket| (bucket.category_id, (bucket.amount, bucket.budget)))
        .collect();

    let mut profiles = Vec::new();
    for category_id in category_ids {
        let series: Vec<f64> = months
            .iter()
            .map(|m| {
                m.get(&category_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
                    .to_f64()
                    .unwrap_or(0.0)
            })
            .collect();
        let mean = series.iter().sum::<f64>() / series.len() as f64;
        if mean <= 0.0 {
            continue;
        }

        let variance =
            series.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / series.len() as f64;
        let coefficient_of_variation = variance.sqrt() / mean * 100.0;
        let band = if coefficient_of_variation < STABLE_CV_PCT {
            VolatilityBand::Stable
        } else if coefficient_of_variation > VOLATILE_CV_PCT {
            VolatilityBand::Volatile
        } else {
            VolatilityBand::Moderate
        };

        // Recent half of the window against the prior half.
        let recent = series[..3].iter().sum::<f64>() / 3.0;
        let prior = series[3..].iter().sum::<f64>() / 3.0;
        let trend_pct = (prior > 0.0).then(|| (recent - prior) / prior * 100.0);
        let trending_up = trend_pct.is_some_and(|pct| pct > TREND_THRESHOLD_PCT);

        let budget_used_pct = current_buckets.get(&category_id).and_then(|(amount, budget)| {
            let budget = (*budget)?;
            if budget <= Decimal::ZERO {
                return None;
            }
            (*amount / budget * Decimal::from(100)).to_f64()
        });
        let approaching_limit = budget_used_pct.is_some_and(|pct| {
            (APPROACHING_LIMIT_LOW_PCT..=APPROACHING_LIMIT_HIGH_PCT).contains(&pct)
        });

        if band == VolatilityBand::Volatile || trending_up || approaching_limit {
            profiles.push(CategoryProfile {
                category_id,
                category_name: names
                    .get(&category_id)
                    .cloned()
                    .unwrap_or_else(|| "uncategorized".to_string()),
                monthly_mean: Decimal::try_from(mean).unwrap_or(Decimal::ZERO),
                coefficient_of_variation,
                band,
                trending_up,
                trend_pct,
                approaching_limit,
                budget_used_pct,
            });
        }
    }

    profiles.sort_by(|a, b| {
        b.coefficient_of_variation
            .partial_cmp(&a.coefficient_of_variation)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    profiles
}
