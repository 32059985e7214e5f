//! Aggregates ledger expenses into monthly totals and per-category
//! breakdowns, with each bucket carrying its resolved budget limit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use model::entities::Category;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::budget::BudgetResolver;
use crate::error::Result;
use crate::recurrence::month_bounds;
use crate::store::{CategoryStore, ExpenseStore};

/// One category's share of a period's spending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category_id: i64,
    pub category_name: String,
    pub amount: Decimal,
    pub count: usize,
    /// The resolved limit for the requested scope, when one exists.
    pub budget: Option<Decimal>,
}

/// Spending totals for a scope over a period.
///
/// Invariant: `total` equals the exact sum of the per-category amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub total: Decimal,
    pub count: usize,
    /// Sorted by amount, largest first.
    pub by_category: Vec<CategoryStats>,
}

#[derive(Clone)]
pub struct StatsAggregator {
    expenses: Arc<dyn ExpenseStore>,
    categories: Arc<dyn CategoryStore>,
    resolver: BudgetResolver,
}

impl StatsAggregator {
    pub fn new(
        expenses: Arc<dyn ExpenseStore>,
        categories: Arc<dyn CategoryStore>,
        resolver: BudgetResolver,
    ) -> Self {
        Self {
            expenses,
            categories,
            resolver,
        }
    }

    /// Aggregates one calendar month for the scope.
    ///
    /// A user scope sees their own entries plus everything in shared
    /// categories regardless of who paid (household cost sharing); the
    /// `None` scope sees everyone's entries. With `include_projected`
    /// false, "spent" means settled and non-projected only.
    #[instrument(skip(self))]
    pub async fn compute_stats(
        &self,
        scope: Option<i64>,
        month: u32,
        year: i32,
        include_projected: bool,
        category_filter: Option<i64>,
    ) -> Result<MonthlyStats> {
        let (start, end) = month_bounds(year, month);
        self.compute_range(scope, start, end, include_projected, category_filter)
            .await
    }

    /// Aggregates an arbitrary inclusive date range; the mid-month
    /// comparison uses this for partial-month windows.
    #[instrument(skip(self))]
    pub async fn compute_range(
        &self,
        scope: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
        include_projected: bool,
        category_filter: Option<i64>,
    ) -> Result<MonthlyStats> {
        let categories: HashMap<i64, Category> = self
            .categories
            .categories()
            .await?
            .into_iter()
            .map(|category| (category.id, category))
            .collect();

        let expenses = self.expenses.expenses_in_range(start, end).await?;

        let mut buckets: HashMap<i64, (Decimal, usize)> = HashMap::new();
        let mut count = 0usize;
        for expense in &expenses {
            if let Some(filter) = category_filter {
                if expense.category_id != filter {
                    continue;
                }
            }
            if !include_projected && (expense.is_projected || !expense.is_settled) {
                continue;
            }
            if let Some(user_id) = scope {
                let shared = categories
                    .get(&expense.category_id)
                    .is_some_and(|category| category.is_shared);
                if expense.owner_user_id != user_id && !shared {
                    continue;
                }
            }

            let bucket = buckets
                .entry(expense.category_id)
                .or_insert((Decimal::ZERO, 0));
            bucket.0 += expense.amount;
            bucket.1 += 1;
            count += 1;
        }

        let mut by_category = Vec::with_capacity(buckets.len());
        let mut total = Decimal::ZERO;
        for (category_id, (amount, entries)) in buckets {
            total += amount;
            let budget = self
                .resolver
                .resolve_scoped(scope, category_id, start.month(), start.year())
                .await?;
            let category_name = categories
                .get(&category_id)
                .map_or_else(|| "uncategorized".to_string(), |c| c.name.clone());
            by_category.push(CategoryStats {
                category_id,
                category_name,
                amount,
                count: entries,
                budget,
            });
        }
        by_category.sort_by(|a, b| b.amount.cmp(&a.amount));

        debug!(%total, count, categories = by_category.len(), "stats aggregated");
        Ok(MonthlyStats {
            total,
            count,
            by_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{expense, MemoryStore};
    use model::entities::User;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn aggregator(store: MemoryStore) -> StatsAggregator {
        let store = Arc::new(store);
        let resolver = BudgetResolver::new(store.clone(), store.clone(), store.clone());
        StatsAggregator::new(store.clone(), store, resolver)
    }

    fn base_store() -> MemoryStore {
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
    }

    #[tokio::test]
    async fn shared_category_spending_is_visible_to_every_member() {
        let store = base_store()
            // Ben paid for shared groceries, Ana has a personal expense.
            .with_expense(expense(1, 2, dec(120), d(2024, 6, 3), 10))
            .with_expense(expense(2, 1, dec(40), d(2024, 6, 4), 11))
            // Ben's personal expense stays invisible to Ana.
            .with_expense(expense(3, 2, dec(75), d(2024, 6, 5), 11));

        let stats = aggregator(store)
            .compute_stats(Some(1), 6, 2024, true, None)
            .await
            .unwrap();

        assert_eq!(stats.total, dec(160));
        assert_eq!(stats.count, 2);
    }

    #[tokio::test]
    async fn excluding_projected_restricts_to_settled_money() {
        let mut projected = expense(1, 1, dec(300), d(2024, 6, 10), 10);
        projected.is_projected = true;
        projected.is_settled = false;
        let mut unsettled = expense(2, 1, dec(50), d(2024, 6, 11), 10);
        unsettled.is_settled = false;

        let store = base_store()
            .with_expense(projected)
            .with_expense(unsettled)
            .with_expense(expense(3, 1, dec(200), d(2024, 6, 12), 10));

        let spent = aggregator(store)
            .compute_stats(Some(1), 6, 2024, false, None)
            .await
            .unwrap();
        assert_eq!(spent.total, dec(200));
        assert_eq!(spent.count, 1);
    }

    #[tokio::test]
    async fn category_totals_add_up_to_the_overall_total() {
        let store = base_store()
            .with_expense(expense(1, 1, Decimal::new(1999, 2), d(2024, 6, 1), 10))
            .with_expense(expense(2, 1, Decimal::new(333, 2), d(2024, 6, 2), 11))
            .with_expense(expense(3, 2, Decimal::new(10050, 2), d(2024, 6, 3), 10));

        let stats = aggregator(store)
            .compute_stats(None, 6, 2024, true, None)
            .await
            .unwrap();

        let sum: Decimal = stats.by_category.iter().map(|c| c.amount).sum();
        assert_eq!(sum, stats.total);
        assert_eq!(stats.total, Decimal::new(12382, 2));
    }

    #[tokio::test]
    async fn buckets_carry_resolved_budgets() {
        let store = base_store()
            .with_user_category_default_limit(1, 11, dec(150))
            .with_expense(expense(1, 1, dec(60), d(2024, 6, 1), 10))
            .with_expense(expense(2, 1, dec(30), d(2024, 6, 2), 11));

        let stats = aggregator(store)
            .compute_stats(Some(1), 6, 2024, true, None)
            .await
            .unwrap();

        let groceries = stats.by_category.iter().find(|c| c.category_id == 10).unwrap();
        assert_eq!(groceries.budget, Some(dec(800)));
        let hobbies = stats.by_category.iter().find(|c| c.category_id == 11).unwrap();
        assert_eq!(hobbies.budget, Some(dec(150)));
    }

    #[tokio::test]
    async fn month_bounds_exclude_neighboring_months() {
        let store = base_store()
            .with_expense(expense(1, 1, dec(10), d(2024, 5, 31), 10))
            .with_expense(expense(2, 1, dec(20), d(2024, 6, 1), 10))
            .with_expense(expense(3, 1, dec(30), d(2024, 6, 30), 10))
            .with_expense(expense(4, 1, dec(40), d(2024, 7, 1), 10));

        let stats = aggregator(store)
            .compute_stats(Some(1), 6, 2024, true, None)
            .await
            .unwrap();
        assert_eq!(stats.total, dec(50));
    }
}
