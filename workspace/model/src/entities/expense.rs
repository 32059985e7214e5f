use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single ledger entry, actual or projected.
///
/// Immutable once read by the compute layer; mutations happen in the host
/// application and must invalidate the insight cache for the touched month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: i64,
    pub owner_user_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: i64,
    /// True for expected future costs that have not yet been incurred.
    pub is_projected: bool,
    /// True once the money has actually left an account.
    pub is_settled: bool,
}
