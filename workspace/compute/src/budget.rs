//! Resolves effective spending limits out of the layered override
//! hierarchy.
//!
//! Priority for a (user, category, month) query: the explicit monthly
//! record wins over the user's category default, which wins over the shared
//! category's household limit; personal categories never fall back to the
//! shared layer. Absence of any layer is a distinct `None` outcome, never a
//! zero: a configured limit of zero is a valid answer.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument, trace};

use crate::error::{ComputeError, Result};
use crate::store::{BudgetStore, CategoryStore, UserStore};

#[derive(Clone)]
pub struct BudgetResolver {
    budgets: Arc<dyn BudgetStore>,
    categories: Arc<dyn CategoryStore>,
    users: Arc<dyn UserStore>,
}

impl BudgetResolver {
    pub fn new(
        budgets: Arc<dyn BudgetStore>,
        categories: Arc<dyn CategoryStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            budgets,
            categories,
            users,
        }
    }

    /// Resolves one user's effective limit for a category and month.
    ///
    /// Walks the layers in priority order and returns `None` when no layer
    /// matches.
    #[instrument(skip(self))]
    pub async fn resolve_category_budget(
        &self,
        user_id: i64,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<Decimal>> {
        if let Some(record) = self
            .budgets
            .user_category_month_budget(user_id, category_id, month, year)
            .await?
        {
            trace!(limit = %record.amount, "resolved from explicit monthly record");
            return Ok(Some(record.amount));
        }

        if let Some(record) = self
            .budgets
            .user_category_default_budget(user_id, category_id)
            .await?
        {
            trace!(limit = %record.amount, "resolved from user category default");
            return Ok(Some(record.amount));
        }

        // Only shared categories fall back to the household-wide limit.
        let category = self
            .categories
            .category(category_id)
            .await?
            .ok_or_else(|| {
                ComputeError::DataAccess(format!("unknown category {category_id}"))
            })?;
        if category.is_shared {
            trace!(limit = ?category.global_limit, "resolved from shared category limit");
            return Ok(category.global_limit);
        }

        Ok(None)
    }

    /// Resolves the household-wide budget for a month: the explicit monthly
    /// record, else the global default setting, else zero.
    #[instrument(skip(self))]
    pub async fn resolve_global_budget(&self, month: u32, year: i32) -> Result<Decimal> {
        if let Some(record) = self.budgets.global_month_budget(month, year).await? {
            return Ok(record.amount);
        }
        Ok(self
            .budgets
            .global_default_limit()
            .await?
            .unwrap_or(Decimal::ZERO))
    }

    /// Resolves a category's limit for either a single user or the
    /// aggregate household view.
    ///
    /// In the aggregate view a shared category answers with its household
    /// limit; a personal category answers with the sum of every member's
    /// resolved personal limit, or `None` when nobody has one.
    pub async fn resolve_scoped(
        &self,
        scope: Option<i64>,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<Decimal>> {
        let Some(user_id) = scope else {
            return self.resolve_aggregate(category_id, month, year).await;
        };
        self.resolve_category_budget(user_id, category_id, month, year)
            .await
    }

    async fn resolve_aggregate(
        &self,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<Decimal>> {
        let category = self
            .categories
            .category(category_id)
            .await?
            .ok_or_else(|| {
                ComputeError::DataAccess(format!("unknown category {category_id}"))
            })?;
        if category.is_shared {
            return Ok(category.global_limit);
        }

        // Personal category: combine every member's own envelope. Members
        // without a resolvable limit contribute nothing; when nobody
        // resolves, the category has no budget at all.
        let mut any = false;
        let mut total = Decimal::ZERO;
        for user in self.users.users().await? {
            if let Some(limit) = self
                .resolve_category_budget(user.id, category_id, month, year)
                .await?
            {
                any = true;
                total += limit;
            }
        }
        Ok(any.then_some(total))
    }

    /// Sums the resolved limits of several categories for a scope.
    ///
    /// Returns `None` only when every category resolves to `None`; once any
    /// category resolves, unresolved ones contribute zero.
    #[instrument(skip(self, category_ids), fields(categories = category_ids.len()))]
    pub async fn sum_category_budgets(
        &self,
        scope: Option<i64>,
        category_ids: &[i64],
        month: u32,
        year: i32,
    ) -> Result<Option<Decimal>> {
        let mut any = false;
        let mut total = Decimal::ZERO;
        for &category_id in category_ids {
            if let Some(limit) = self.resolve_scoped(scope, category_id, month, year).await? {
                any = true;
                total += limit;
            }
        }
        debug!(resolved = any, %total, "summed category budgets");
        Ok(any.then_some(total))
    }

    /// The effective monthly budget for a scope: the sum of its resolved
    /// category limits, falling back to the household monthly budget when no
    /// category limit is configured anywhere.
    pub async fn monthly_budget(&self, scope: Option<i64>, month: u32, year: i32) -> Result<Decimal> {
        let category_ids: Vec<i64> = self
            .categories
            .categories()
            .await?
            .iter()
            .map(|category| category.id)
            .collect();
        match self
            .sum_category_budgets(scope, &category_ids, month, year)
            .await?
        {
            Some(total) => Ok(total),
            None => self.resolve_global_budget(month, year).await,
        }
    }

    /// Prior-period rollover reducing the scope's effective budget.
    pub async fn carryover(&self, scope: Option<i64>, month: u32, year: i32) -> Result<Decimal> {
        self.budgets.carryover(scope, month, year).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use model::entities::{Category, User};

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn resolver(store: MemoryStore) -> BudgetResolver {
        let store = Arc::new(store);
        BudgetResolver::new(store.clone(), store.clone(), store)
    }

    #[tokio::test]
    async fn monthly_override_wins_over_default() {
        let store = MemoryStore::new()
            .with_category(Category {
                id: 10,
                name: "groceries".into(),
                is_shared: false,
                global_limit: None,
            })
            .with_user_category_month_limit(1, 10, 6, 2024, dec(500))
            .with_user_category_default_limit(1, 10, dec(300));

        let resolver = resolver(store);
        assert_eq!(
            resolver.resolve_category_budget(1, 10, 6, 2024).await.unwrap(),
            Some(dec(500))
        );
        // Another month falls back to the default.
        assert_eq!(
            resolver.resolve_category_budget(1, 10, 7, 2024).await.unwrap(),
            Some(dec(300))
        );
    }

    #[tokio::test]
    async fn personal_category_never_uses_shared_fallback() {
        let store = MemoryStore::new()
            .with_category(Category {
                id: 10,
                name: "hobbies".into(),
                is_shared: false,
                global_limit: Some(dec(900)),
            })
            .with_category(Category {
                id: 11,
                name: "household".into(),
                is_shared: true,
                global_limit: Some(dec(700)),
            });

        let resolver = resolver(store);
        // Personal category with no user overrides resolves to none even
        // though a global limit value is present on the record.
        assert_eq!(
            resolver.resolve_category_budget(1, 10, 6, 2024).await.unwrap(),
            None
        );
        assert_eq!(
            resolver.resolve_category_budget(1, 11, 6, 2024).await.unwrap(),
            Some(dec(700))
        );
    }

    #[tokio::test]
    async fn zero_is_a_valid_configured_limit() {
        let store = MemoryStore::new()
            .with_category(Category {
                id: 10,
                name: "vices".into(),
                is_shared: false,
                global_limit: None,
            })
            .with_user_category_default_limit(1, 10, Decimal::ZERO);

        let resolver = resolver(store);
        assert_eq!(
            resolver.resolve_category_budget(1, 10, 6, 2024).await.unwrap(),
            Some(Decimal::ZERO)
        );
    }

    #[tokio::test]
    async fn global_budget_falls_back_to_default_then_zero() {
        let store = MemoryStore::new()
            .with_global_month_limit(6, 2024, dec(4000))
            .with_global_default_limit(dec(3000));
        let configured = resolver(store);

        assert_eq!(configured.resolve_global_budget(6, 2024).await.unwrap(), dec(4000));
        assert_eq!(configured.resolve_global_budget(7, 2024).await.unwrap(), dec(3000));

        let empty = resolver(MemoryStore::new());
        assert_eq!(empty.resolve_global_budget(6, 2024).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn aggregate_view_sums_personal_envelopes() {
        let store = MemoryStore::new()
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
                name: "clothes".into(),
                is_shared: false,
                global_limit: None,
            })
            .with_user_category_default_limit(1, 10, dec(1000))
            .with_user_category_default_limit(2, 10, dec(1500));

        let resolver = resolver(store);
        assert_eq!(
            resolver.resolve_scoped(None, 10, 6, 2024).await.unwrap(),
            Some(dec(2500))
        );
    }

    #[tokio::test]
    async fn aggregate_view_prefers_shared_limit_over_member_overrides() {
        let store = MemoryStore::new()
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
                global_limit: Some(dec(2000)),
            })
            .with_user_category_default_limit(1, 10, dec(1000))
            .with_user_category_default_limit(2, 10, dec(1500));

        let resolver = resolver(store);
        assert_eq!(
            resolver.resolve_scoped(None, 10, 6, 2024).await.unwrap(),
            Some(dec(2000))
        );
    }

    #[tokio::test]
    async fn sum_treats_unresolved_categories_as_zero_once_any_resolves() {
        let store = MemoryStore::new()
            .with_user(User {
                id: 1,
                name: "ana".into(),
            })
            .with_category(Category {
                id: 10,
                name: "a".into(),
                is_shared: false,
                global_limit: None,
            })
            .with_category(Category {
                id: 11,
                name: "b".into(),
                is_shared: false,
                global_limit: None,
            })
            .with_user_category_default_limit(1, 10, dec(250));

        let resolver = resolver(store);
        assert_eq!(
            resolver
                .sum_category_budgets(Some(1), &[10, 11], 6, 2024)
                .await
                .unwrap(),
            Some(dec(250))
        );
        assert_eq!(
            resolver
                .sum_category_budgets(Some(1), &[11], 6, 2024)
                .await
                .unwrap(),
            None
        );
    }
}
