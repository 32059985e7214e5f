//! In-memory collaborators and fixture builders for tests.
//!
//! `MemoryStore` implements every data-access trait over plain vectors and
//! maps, so scenarios can be assembled declaratively without a database.
//! Host applications may also use it for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use model::entities::{
    Category, ExpenseRecord, GlobalMonthBudget, InsightData, Obligation, ObligationKind,
    RecurrenceRule, User, UserCategoryBudget, UserCategoryMonthBudget,
};
use rust_decimal::Decimal;

use crate::error::{ComputeError, Result};
use crate::store::{
    BudgetStore, CategoryStore, ExpenseStore, ObligationStore, TextFormatter, UserStore,
};

/// An immutable in-memory snapshot backing all store traits.
#[derive(Default)]
pub struct MemoryStore {
    obligations: Vec<Obligation>,
    expenses: Vec<ExpenseRecord>,
    categories: Vec<Category>,
    users: Vec<User>,
    user_category_month: HashMap<(i64, i64, u32, i32), Decimal>,
    user_category_default: HashMap<(i64, i64), Decimal>,
    global_month: HashMap<(u32, i32), Decimal>,
    global_default: Option<Decimal>,
    carryovers: HashMap<(Option<i64>, u32, i32), Decimal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_expense(mut self, expense: ExpenseRecord) -> Self {
        self.expenses.push(expense);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_user_category_month_limit(
        mut self,
        user_id: i64,
        category_id: i64,
        month: u32,
        year: i32,
        amount: Decimal,
    ) -> Self {
        self.user_category_month
            .insert((user_id, category_id, month, year), amount);
        self
    }

    pub fn with_user_category_default_limit(
        mut self,
        user_id: i64,
        category_id: i64,
        amount: Decimal,
    ) -> Self {
        self.user_category_default
            .insert((user_id, category_id), amount);
        self
    }

    pub fn with_global_month_limit(mut self, month: u32, year: i32, amount: Decimal) -> Self {
        self.global_month.insert((month, year), amount);
        self
    }

    pub fn with_global_default_limit(mut self, amount: Decimal) -> Self {
        self.global_default = Some(amount);
        self
    }

    pub fn with_carryover(
        mut self,
        scope: Option<i64>,
        month: u32,
        year: i32,
        amount: Decimal,
    ) -> Self {
        self.carryovers.insert((scope, month, year), amount);
        self
    }
}

fn in_scope(obligation: &Obligation, scope: Option<i64>) -> bool {
    scope.is_none_or(|user_id| obligation.owner_user_id == user_id)
}

#[async_trait]
impl ObligationStore for MemoryStore {
    async fn active_recurring(&self, scope: Option<i64>) -> Result<Vec<Obligation>> {
        Ok(self
            .obligations
            .iter()
            .filter(|o| {
                o.is_recurring()
                    && o.is_active
                    && !o.is_settled
                    && o.is_projected
                    && in_scope(o, scope)
            })
            .cloned()
            .collect())
    }

    async fn pending_reminders(
        &self,
        scope: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Obligation>> {
        Ok(self
            .obligations
            .iter()
            .filter(|o| {
                o.is_reminder()
                    && o.is_active
                    && !o.is_settled
                    && o.occurrence_date
                        .is_some_and(|date| date >= start && date <= end)
                    && in_scope(o, scope)
            })
            .cloned()
            .collect())
    }

    async fn due_unsettled(
        &self,
        scope: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Obligation>> {
        Ok(self
            .obligations
            .iter()
            .filter(|o| {
                let due_date = match o.kind {
                    ObligationKind::Reminder => o.occurrence_date,
                    ObligationKind::Recurring => o.next_due_date,
                };
                o.is_active
                    && !o.is_settled
                    && !o.is_projected
                    && due_date.is_some_and(|date| date >= start && date <= end)
                    && in_scope(o, scope)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn expenses_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .expenses
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn user_category_month_budget(
        &self,
        user_id: i64,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<UserCategoryMonthBudget>> {
        Ok(self
            .user_category_month
            .get(&(user_id, category_id, month, year))
            .map(|&amount| UserCategoryMonthBudget {
                user_id,
                category_id,
                month,
                year,
                amount,
            }))
    }

    async fn user_category_default_budget(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<Option<UserCategoryBudget>> {
        Ok(self
            .user_category_default
            .get(&(user_id, category_id))
            .map(|&amount| UserCategoryBudget {
                user_id,
                category_id,
                amount,
            }))
    }

    async fn global_month_budget(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Option<GlobalMonthBudget>> {
        Ok(self
            .global_month
            .get(&(month, year))
            .map(|&amount| GlobalMonthBudget {
                month,
                year,
                amount,
            }))
    }

    async fn global_default_limit(&self) -> Result<Option<Decimal>> {
        Ok(self.global_default)
    }

    async fn carryover(&self, scope: Option<i64>, month: u32, year: i32) -> Result<Decimal> {
        Ok(self
            .carryovers
            .get(&(scope, month, year))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.clone())
    }
}

/// A settled, non-projected ledger entry.
pub fn expense(
    id: i64,
    owner_user_id: i64,
    amount: Decimal,
    date: NaiveDate,
    category_id: i64,
) -> ExpenseRecord {
    ExpenseRecord {
        id,
        owner_user_id,
        amount,
        date,
        category_id,
        is_projected: false,
        is_settled: true,
    }
}

/// An active, still-projected recurring obligation.
#[allow(clippy::too_many_arguments)]
pub fn recurring(
    id: i64,
    owner_user_id: i64,
    description: &str,
    amount: Decimal,
    category_id: i64,
    rule: RecurrenceRule,
    next_due_date: NaiveDate,
    series_end_date: NaiveDate,
) -> Obligation {
    Obligation {
        id,
        owner_user_id,
        description: description.to_string(),
        amount,
        category_id,
        kind: ObligationKind::Recurring,
        is_active: true,
        is_settled: false,
        is_projected: true,
        occurrence_date: None,
        recurrence: Some(rule),
        next_due_date: Some(next_due_date),
        series_end_date: Some(series_end_date),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// An active, still-projected reminder.
pub fn reminder(
    id: i64,
    owner_user_id: i64,
    description: &str,
    amount: Decimal,
    category_id: i64,
    occurrence_date: NaiveDate,
) -> Obligation {
    Obligation {
        id,
        owner_user_id,
        description: description.to_string(),
        amount,
        category_id,
        kind: ObligationKind::Reminder,
        is_active: true,
        is_settled: false,
        is_projected: true,
        occurrence_date: Some(occurrence_date),
        recurrence: None,
        next_due_date: None,
        series_end_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A formatter that returns fixed text and counts invocations, for cache
/// behavior tests.
pub struct CountingFormatter {
    text: String,
    calls: AtomicUsize,
}

impl CountingFormatter {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextFormatter for CountingFormatter {
    async fn render(&self, _data: &InsightData) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// An expense store whose reads always fail, for error-propagation tests.
pub struct FailingExpenseStore;

#[async_trait]
impl ExpenseStore for FailingExpenseStore {
    async fn expenses_in_range(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        Err(ComputeError::DataAccess("connection refused".into()))
    }
}
