//! Collaborator contracts for everything the compute layer does not own:
//! reading obligations, ledger expenses, budget overrides, categories and
//! users, and rendering insight text.
//!
//! Implementations live in the host application (backed by whatever
//! persistence it uses); [`crate::testing::MemoryStore`] provides an
//! in-memory implementation for tests. All reads return plain `model` data;
//! no compute logic belongs behind these traits. Failures surface as
//! [`ComputeError::DataAccess`](crate::error::ComputeError) and are
//! propagated unchanged by the low-level components.

use async_trait::async_trait;
use chrono::NaiveDate;
use model::entities::{
    Category, ExpenseRecord, GlobalMonthBudget, InsightData, Obligation, User,
    UserCategoryBudget, UserCategoryMonthBudget,
};
use rust_decimal::Decimal;

use crate::error::Result;

/// Read access to recurring bills and reminders.
#[async_trait]
pub trait ObligationStore: Send + Sync {
    /// Active, unsettled, still-projected recurring obligations, optionally
    /// restricted to one owner.
    async fn active_recurring(&self, scope: Option<i64>) -> Result<Vec<Obligation>>;

    /// Active, unsettled reminders whose occurrence date falls within the
    /// inclusive range.
    async fn pending_reminders(
        &self,
        scope: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Obligation>>;

    /// Obligations that have already become due (no longer projected) but
    /// are not yet settled, dated within the inclusive range.
    async fn due_unsettled(
        &self,
        scope: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Obligation>>;
}

/// Read access to the expense ledger.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// All users' ledger entries dated within the inclusive range.
    ///
    /// Scope filtering happens in the aggregator because the household
    /// cost-sharing rule needs cross-user visibility of shared categories.
    async fn expenses_in_range(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<ExpenseRecord>>;
}

/// Read access to the layered budget override records.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Layer 1: explicit limit for one user, category and month.
    async fn user_category_month_budget(
        &self,
        user_id: i64,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<UserCategoryMonthBudget>>;

    /// Layer 2: the user's default limit for a category.
    async fn user_category_default_budget(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<Option<UserCategoryBudget>>;

    /// Household-wide limit for one month.
    async fn global_month_budget(&self, month: u32, year: i32)
        -> Result<Option<GlobalMonthBudget>>;

    /// Household-wide default limit.
    async fn global_default_limit(&self) -> Result<Option<Decimal>>;

    /// Prior-period rollover that reduces the scope's effective budget for
    /// the month. Zero when nothing is carried over.
    async fn carryover(&self, scope: Option<i64>, month: u32, year: i32) -> Result<Decimal>;
}

/// Read access to category metadata.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn category(&self, id: i64) -> Result<Option<Category>>;

    async fn categories(&self) -> Result<Vec<Category>>;
}

/// Read access to the household member list.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn users(&self) -> Result<Vec<User>>;
}

/// The external natural-language collaborator that phrases a structured
/// insight.
///
/// May fail or be unavailable; the insight engine then falls back to its own
/// deterministic templates, so a formatter failure never reaches callers.
#[async_trait]
pub trait TextFormatter: Send + Sync {
    async fn render(&self, data: &InsightData) -> Result<String>;
}
