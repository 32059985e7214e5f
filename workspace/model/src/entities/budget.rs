use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Layer 1 of the budget override hierarchy: an explicit limit for one
/// user, one category and one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCategoryMonthBudget {
    pub user_id: i64,
    pub category_id: i64,
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
}

/// Layer 2: a user's default limit for a category, applied to any month
/// without an explicit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCategoryBudget {
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
}

/// Layer 4: the household-wide limit for one month, across all categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMonthBudget {
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
}
