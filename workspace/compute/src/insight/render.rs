//! Deterministic fallback text for each insight subtype.
//!
//! The external text formatter phrases insights in natural language; when it
//! is unavailable or errors, the engine renders these templates instead, so
//! an insight always ships with some text.

use model::entities::{InsightData, VolatilityBand};
use rust_decimal::Decimal;
use rusty_money::{iso, Money};

/// Formats an amount in the configured display currency.
fn money(amount: Decimal, currency: &'static iso::Currency) -> String {
    Money::from_decimal(amount, currency).to_string()
}

/// Renders the built-in template for an insight. Pure; one template per
/// subtype.
pub fn fallback_text(data: &InsightData, currency: &'static iso::Currency) -> String {
    match data {
        InsightData::WeightedForecast(forecast) => {
            if forecast.is_over_budget {
                format!(
                    "Based on your last three months you're on track to spend {} this month, {} over your {} budget.",
                    money(forecast.predicted_spending, currency),
                    money(forecast.difference, currency),
                    money(forecast.budget, currency),
                )
            } else {
                format!(
                    "Based on your last three months you're on track to spend {} this month, leaving {} of your {} budget to spare.",
                    money(forecast.predicted_spending, currency),
                    money(forecast.difference, currency),
                    money(forecast.budget, currency),
                )
            }
        }
        InsightData::PaceAlert(pace) => {
            let target = match pace.daily_target {
                Some(target) => format!(
                    " Keep daily spending under {} to finish the month on budget.",
                    money(target.round_dp(2), currency)
                ),
                None => String::new(),
            };
            if pace.is_over_budget {
                format!(
                    "You've spent {} in {} days ({} per day); at this pace the month ends at {}, {} over your {} budget.{}",
                    money(pace.spent_so_far, currency),
                    pace.days_elapsed,
                    money(pace.daily_average.round_dp(2), currency),
                    money(pace.projected_total.round_dp(2), currency),
                    money(pace.over_by.round_dp(2), currency),
                    money(pace.effective_budget, currency),
                    target,
                )
            } else {
                format!(
                    "You've spent {} in {} days ({} per day), on pace for {} of your {} budget.{}",
                    money(pace.spent_so_far, currency),
                    pace.days_elapsed,
                    money(pace.daily_average.round_dp(2), currency),
                    money(pace.projected_total.round_dp(2), currency),
                    money(pace.effective_budget, currency),
                    target,
                )
            }
        }
        InsightData::Anomalies(anomalies) => {
            let Some(top) = anomalies.anomalies.first() else {
                return "No unusual category spending this month.".to_string();
            };
            let direction = if top.deviation_pct >= 0.0 { "above" } else { "below" };
            let rest = anomalies.anomalies.len() - 1;
            let tail = if rest > 0 {
                format!(" {rest} other categories also look unusual.")
            } else {
                String::new()
            };
            format!(
                "{} is running {:.0}% {} its three-month average ({} projected vs {} typical).{}",
                top.category_name,
                top.deviation_pct.abs(),
                direction,
                money(top.projected_amount.round_dp(2), currency),
                money(top.historical_mean.round_dp(2), currency),
                tail,
            )
        }
        InsightData::MonthOverMonth(progress) => {
            let delta = money(progress.delta.abs(), currency);
            if progress.is_ahead {
                format!(
                    "You've spent {} so far this month, {} more than by the same day last month.",
                    money(progress.current_to_date, currency),
                    delta,
                )
            } else {
                format!(
                    "You've spent {} so far this month, {} less than by the same day last month.",
                    money(progress.current_to_date, currency),
                    delta,
                )
            }
        }
        InsightData::CategoryInsights(insights) => {
            let Some(top) = insights.categories.first() else {
                return "Your category spending looks steady this month.".to_string();
            };
            let mut notes = Vec::new();
            if top.band == VolatilityBand::Volatile {
                notes.push("varies a lot month to month".to_string());
            }
            if top.trending_up {
                if let Some(pct) = top.trend_pct {
                    notes.push(format!("is trending up {pct:.0}%"));
                }
            }
            if top.approaching_limit {
                if let Some(pct) = top.budget_used_pct {
                    notes.push(format!("is at {pct:.0}% of its budget"));
                }
            }
            format!(
                "Worth a look: {} {}.",
                top.category_name,
                if notes.is_empty() {
                    "shows an unusual pattern".to_string()
                } else {
                    notes.join(" and ")
                },
            )
        }
        InsightData::MonthComparison(comparison) => {
            let change = match comparison.change_pct {
                Some(pct) => format!(" ({pct:+.1}%)"),
                None => String::new(),
            };
            let mut text = format!(
                "You spent {} this month versus {} last month{}.",
                money(comparison.current_total, currency),
                money(comparison.previous_total, currency),
                change,
            );
            if let Some(savings) = &comparison.biggest_savings {
                text.push_str(&format!(
                    " Biggest savings: {} ({} less).",
                    savings.category_name,
                    money(savings.change.abs(), currency),
                ));
            }
            if let Some(increase) = &comparison.biggest_increase {
                text.push_str(&format!(
                    " Biggest increase: {} ({} more).",
                    increase.category_name,
                    money(increase.change, currency),
                ));
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::{MonthComparison, PaceAlert, WeightedForecast};

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn pace_alert_template_mentions_overrun_and_target() {
        let data = InsightData::PaceAlert(PaceAlert {
            spent_so_far: dec(6000),
            daily_average: dec(400),
            projected_total: dec(12000),
            effective_budget: dec(10000),
            carryover: Decimal::ZERO,
            is_over_budget: true,
            over_by: dec(2000),
            daily_target: Some(Decimal::new(26667, 2)),
            days_elapsed: 15,
            days_remaining: 15,
        });

        let text = fallback_text(&data, iso::USD);
        assert!(text.contains("$12,000.00"), "{text}");
        assert!(text.contains("$2,000.00 over"), "{text}");
        assert!(text.contains("$266.67"), "{text}");
    }

    #[test]
    fn weighted_forecast_template_is_deterministic() {
        let data = InsightData::WeightedForecast(WeightedForecast {
            predicted_spending: dec(4700),
            budget: dec(5000),
            difference: dec(300),
            is_over_budget: false,
        });
        assert_eq!(
            fallback_text(&data, iso::USD),
            fallback_text(&data, iso::USD)
        );
        assert!(fallback_text(&data, iso::USD).contains("to spare"));
    }

    #[test]
    fn month_comparison_names_biggest_movers() {
        let data = InsightData::MonthComparison(MonthComparison {
            current_total: dec(900),
            previous_total: dec(1000),
            change_pct: Some(-10.0),
            by_category: vec![],
            biggest_savings: Some(model::entities::insight::CategoryDelta {
                category_id: 10,
                category_name: "dining".into(),
                previous: dec(300),
                current: dec(150),
                change: dec(-150),
                change_pct: Some(-50.0),
            }),
            biggest_increase: None,
        });

        let text = fallback_text(&data, iso::USD);
        assert!(text.contains("dining"));
        assert!(text.contains("$150.00 less"));
    }
}
