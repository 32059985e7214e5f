use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The analytical mode of an insight, derived from the day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightPhase {
    StartOfMonth,
    MidMonth,
    EndOfMonth,
}

impl InsightPhase {
    /// Classifies a day of the month into a phase: days 1-7 are the start of
    /// the month, 8-20 the middle, 21 onward the end.
    pub fn for_day(day: u32) -> Self {
        match day {
            1..=7 => InsightPhase::StartOfMonth,
            8..=20 => InsightPhase::MidMonth,
            _ => InsightPhase::EndOfMonth,
        }
    }
}

/// The natural unique key of a cached insight.
///
/// `scope` is `None` for the aggregate household view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsightKey {
    pub scope: Option<i64>,
    pub month: u32,
    pub year: i32,
    pub phase: InsightPhase,
}

/// A computed insight: the structured data plus its rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightEntry {
    pub data: InsightData,
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

/// The structured result of an insight computation.
///
/// Each subtype carries an explicit discriminant tag; consumers must never
/// have to sniff which optional fields happen to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightData {
    /// Start-of-month weighted prediction of this month's total spending.
    WeightedForecast(WeightedForecast),
    /// Mid-month burn-rate alert against the effective budget.
    PaceAlert(PaceAlert),
    /// Mid-month per-category deviations from recent history.
    Anomalies(Anomalies),
    /// Mid-month spending progress versus the same day last month.
    MonthOverMonth(MonthOverMonth),
    /// Mid-month per-category volatility, trend and limit warnings.
    CategoryInsights(CategoryInsights),
    /// End-of-month comparison against the previous month.
    MonthComparison(MonthComparison),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedForecast {
    pub predicted_spending: Decimal,
    pub budget: Decimal,
    /// Absolute distance between the prediction and the budget.
    pub difference: Decimal,
    pub is_over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceAlert {
    pub spent_so_far: Decimal,
    pub daily_average: Decimal,
    pub projected_total: Decimal,
    /// The monthly budget reduced by any carryover from prior periods.
    pub effective_budget: Decimal,
    pub carryover: Decimal,
    pub is_over_budget: bool,
    /// How far the projection overshoots the effective budget. Zero when on
    /// pace.
    pub over_by: Decimal,
    /// Spending per remaining day that keeps the month within budget. None
    /// once the month has no days left.
    pub daily_target: Option<Decimal>,
    pub days_elapsed: u32,
    pub days_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomalies {
    /// Sorted by absolute deviation, largest first.
    pub anomalies: Vec<CategoryAnomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnomaly {
    pub category_id: i64,
    pub category_name: String,
    pub current_amount: Decimal,
    /// The current amount projected to a full month at the current pace.
    pub projected_amount: Decimal,
    pub historical_mean: Decimal,
    /// Percent deviation of the projection from the historical mean.
    pub deviation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthOverMonth {
    pub current_to_date: Decimal,
    /// Last month's total up to the same day of month.
    pub previous_to_date: Decimal,
    pub delta: Decimal,
    /// None when last month had no spending to compare against.
    pub delta_pct: Option<f64>,
    pub is_ahead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsights {
    pub categories: Vec<CategoryProfile>,
}

/// How steady a category's monthly spending has been over the rolling
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityBand {
    /// Coefficient of variation below 15%.
    Stable,
    Moderate,
    /// Coefficient of variation above 50%.
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub category_id: i64,
    pub category_name: String,
    pub monthly_mean: Decimal,
    /// `std_dev / mean * 100` over the rolling window.
    pub coefficient_of_variation: f64,
    pub band: VolatilityBand,
    pub trending_up: bool,
    /// Percent increase of the recent half of the window over the prior
    /// half. None when the prior half had no spending.
    pub trend_pct: Option<f64>,
    pub approaching_limit: bool,
    /// Share of the resolved budget consumed this month, when a budget
    /// exists.
    pub budget_used_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthComparison {
    pub current_total: Decimal,
    pub previous_total: Decimal,
    pub change_pct: Option<f64>,
    pub by_category: Vec<CategoryDelta>,
    /// The single largest decrease among categories with nonzero change.
    pub biggest_savings: Option<CategoryDelta>,
    /// The single largest increase among categories with nonzero change.
    pub biggest_increase: Option<CategoryDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub category_id: i64,
    pub category_name: String,
    pub previous: Decimal,
    pub current: Decimal,
    pub change: Decimal,
    pub change_pct: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_classification_boundaries() {
        assert_eq!(InsightPhase::for_day(1), InsightPhase::StartOfMonth);
        assert_eq!(InsightPhase::for_day(7), InsightPhase::StartOfMonth);
        assert_eq!(InsightPhase::for_day(8), InsightPhase::MidMonth);
        assert_eq!(InsightPhase::for_day(20), InsightPhase::MidMonth);
        assert_eq!(InsightPhase::for_day(21), InsightPhase::EndOfMonth);
        assert_eq!(InsightPhase::for_day(31), InsightPhase::EndOfMonth);
    }

    #[test]
    fn insight_data_carries_explicit_tag() {
        let data = InsightData::MonthOverMonth(MonthOverMonth {
            current_to_date: Decimal::new(1200, 0),
            previous_to_date: Decimal::new(1000, 0),
            delta: Decimal::new(200, 0),
            delta_pct: Some(20.0),
            is_ahead: true,
        });

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["kind"], "month_over_month");
        assert!(json["is_ahead"].as_bool().unwrap());
    }
}
