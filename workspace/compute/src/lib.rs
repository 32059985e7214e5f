pub mod budget;
pub mod error;
pub mod forecast;
pub mod insight;
pub mod recurrence;
pub mod stats;
pub mod store;
pub mod testing;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use budget::BudgetResolver;
use forecast::ForecastBuilder;
use insight::cache::MemoryInsightCache;
use insight::InsightEngine;
use stats::StatsAggregator;
use store::{BudgetStore, CategoryStore, ExpenseStore, ObligationStore, UserStore};

/// Returns a default pre-configured insight engine that will be used most of
/// the time.
///
/// This function uses the provided date as "today" or the current date if
/// none is provided. Text rendering uses the built-in templates until a
/// formatter is attached, and results are memoized in an in-process cache.
pub fn default_engine(
    obligations: Arc<dyn ObligationStore>,
    expenses: Arc<dyn ExpenseStore>,
    budgets: Arc<dyn BudgetStore>,
    categories: Arc<dyn CategoryStore>,
    users: Arc<dyn UserStore>,
    today: Option<NaiveDate>,
) -> InsightEngine {
    // Create the today date
    let today = today.unwrap_or_else(|| Utc::now().date_naive());

    // The resolver feeds both the aggregator and the engine itself
    let resolver = BudgetResolver::new(budgets, categories.clone(), users);
    let stats = StatsAggregator::new(expenses, categories, resolver.clone());
    let forecast = ForecastBuilder::new(obligations, today);

    InsightEngine::new(
        stats,
        forecast,
        resolver,
        Arc::new(MemoryInsightCache::with_defaults()),
        today,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::{Category, InsightData, RecurrenceRule, User};
    use rust_decimal::Decimal;
    use testing::{expense, recurring, MemoryStore};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    /// Household scenario across the whole engine: two members, a shared
    /// grocery budget, one personal envelope and an upcoming rent bill.
    #[tokio::test]
    async fn household_month_outlook() {
        let store = Arc::new(
            MemoryStore::new()
                .with_user(User {
                    id: 1,
                    name: "ana".into(),
                })
                .with_user(User {
                    id: 2,
                    name: "ben".into(),
                })
                .with_category(Category {
                    id: 10,
                    name: "groceries".into(),
                    is_shared: true,
                    global_limit: Some(dec(800)),
                })
                .with_category(Category {
                    id: 11,
                    name: "hobbies".into(),
                    is_shared: false,
                    global_limit: None,
                })
                .with_user_category_default_limit(1, 11, dec(200))
                .with_expense(expense(1, 1, dec(300), d(2024, 6, 2), 10))
                .with_expense(expense(2, 2, dec(250), d(2024, 6, 7), 10))
                .with_expense(expense(3, 1, dec(120), d(2024, 6, 9), 11))
                .with_obligation(recurring(
                    1,
                    1,
                    "rent",
                    dec(1500),
                    10,
                    RecurrenceRule::monthly_on(25),
                    d(2024, 6, 25),
                    d(2030, 1, 1),
                )),
        );

        let engine = default_engine(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Some(d(2024, 6, 14)),
        );

        let outlook = engine.month_outlook(None).await.unwrap();
        assert_eq!(outlook.forecast.total_amount, dec(1500));
        assert_eq!(outlook.forecast.bill_count, 1);

        // 670 spent by day 14 of 30 projects past the 1,000 aggregate
        // budget (800 shared + 200 personal envelope).
        let insight = outlook.insight.expect("current month yields an insight");
        let InsightData::PaceAlert(pace) = insight.data else {
            panic!("expected a pace alert, got {:?}", insight.data);
        };
        assert_eq!(pace.spent_so_far, dec(670));
        assert_eq!(pace.effective_budget, dec(1000));
        assert!(pace.is_over_budget);
        assert!(!insight.text.is_empty());
    }
}
