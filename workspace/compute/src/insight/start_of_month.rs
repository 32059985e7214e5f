//! Start-of-month insight: a weighted prediction of this month's total from
//! the last three months' spending.

use chrono::{Datelike, NaiveDate};
use model::entities::{InsightData, WeightedForecast};
use rust_decimal::Decimal;
use tokio::try_join;
use tracing::debug;

use crate::budget::BudgetResolver;
use crate::error::Result;
use crate::recurrence::months_back;
use crate::stats::StatsAggregator;

pub(crate) async fn compute(
    stats: &StatsAggregator,
    resolver: &BudgetResolver,
    scope: Option<i64>,
    today: NaiveDate,
) -> Result<InsightData> {
    let (year, month) = (today.year(), today.month());
    let (y1, m1) = months_back(year, month, 1);
    let (y2, m2) = months_back(year, month, 2);
    let (y3, m3) = months_back(year, month, 3);

    // Independent historical reads, evaluated concurrently and joined.
    let (recent, middle, oldest) = try_join!(
        stats.compute_stats(scope, m1, y1, false, None),
        stats.compute_stats(scope, m2, y2, false, None),
        stats.compute_stats(scope, m3, y3, false, None),
    )?;

    // The most recent month carries the most signal.
    let predicted_spending = Decimal::new(5, 1) * recent.total
        + Decimal::new(3, 1) * middle.total
        + Decimal::new(2, 1) * oldest.total;
    let budget = resolver.monthly_budget(scope, month, year).await?;

    debug!(%predicted_spending, %budget, "weighted start-of-month prediction");
    Ok(InsightData::WeightedForecast(WeightedForecast {
        predicted_spending,
        budget,
        difference: (budget - predicted_spending).abs(),
        is_over_budget: predicted_spending > budget,
    }))
}
