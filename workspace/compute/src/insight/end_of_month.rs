//! End-of-month insight: this month against the previous one, with the
//! biggest per-category movers.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use model::entities::{CategoryDelta, InsightData, MonthComparison};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::try_join;
use tracing::debug;

use crate::error::Result;
use crate::recurrence::months_back;
use crate::stats::{MonthlyStats, StatsAggregator};

pub(crate) async fn compute(
    stats: &StatsAggregator,
    scope: Option<i64>,
    today: NaiveDate,
) -> Result<InsightData> {
    let (year, month) = (today.year(), today.month());
    let (prev_year, prev_month) = months_back(year, month, 1);

    let (current, previous) = try_join!(
        stats.compute_stats(scope, month, year, false, None),
        stats.compute_stats(scope, prev_month, prev_year, false, None),
    )?;

    let change_pct = (!previous.total.is_zero()).then(|| {
        ((current.total - previous.total) / previous.total * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0)
    });

    let by_category = category_deltas(&current, &previous);
    let biggest_savings = by_category
        .iter()
        .filter(|delta| delta.change < Decimal::ZERO)
        .min_by_key(|delta| delta.change)
        .cloned();
    let biggest_increase = by_category
        .iter()
        .filter(|delta| delta.change > Decimal::ZERO)
        .max_by_key(|delta| delta.change)
        .cloned();

    debug!(
        current = %current.total,
        previous = %previous.total,
        movers = by_category.len(),
        "end-of-month comparison computed"
    );
    Ok(InsightData::MonthComparison(MonthComparison {
        current_total: current.total,
        previous_total: previous.total,
        change_pct,
        by_category,
        biggest_savings,
        biggest_increase,
    }))
}

/// Per-category deltas over the union of both months, keeping only
/// categories whose spending actually changed.
fn category_deltas(current: &MonthlyStats, previous: &MonthlyStats) -> Vec<CategoryDelta> {
    let mut names: HashMap<i64, &str> = HashMap::new();
    let mut ids = BTreeSet::new();
    let mut current_amounts: HashMap<i64, Decimal> = HashMap::new();
    let mut previous_amounts: HashMap<i64, Decimal> = HashMap::new();

    for bucket in &current.by_category {
        ids.insert(bucket.category_id);
        names.insert(bucket.category_id, bucket.category_name.as_str());
        current_amounts.insert(bucket.category_id, bucket.amount);
    }
    for bucket in &previous.by_category {
        ids.insert(bucket.category_id);
        names.entry(bucket.category_id).or_insert(bucket.category_name.as_str());
        previous_amounts.insert(bucket.category_id, bucket.amount);
    }

    let mut deltas: Vec<CategoryDelta> = ids
        .into_iter()
        .filter_map(|category_id| {
            let current = current_amounts.get(&category_id).copied().unwrap_or(Decimal::ZERO);
            let previous = previous_amounts
                .get(&category_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let change = current - previous;
            if change.is_zero() {
                return None;
            }
            let change_pct = (!previous.is_zero())
                .then(|| (change / previous * Decimal::from(100)).to_f64().unwrap_or(0.0));
            Some(CategoryDelta {
                category_id,
                category_name: names
                    .get(&category_id)
                    .map_or_else(|| "uncategorized".to_string(), |name| (*name).to_string()),
                previous,
                current,
                change,
                change_pct,
            })
        })
        .collect();

    deltas.sort_by(|a, b| b.change.abs().cmp(&a.change.abs()));
    deltas
}
