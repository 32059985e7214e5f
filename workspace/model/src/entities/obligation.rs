use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How often a recurring obligation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A recurrence schedule for a recurring obligation.
///
/// `day_of_month` is only meaningful for `Monthly` and `Yearly` frequencies.
/// When the target month is shorter than the requested day, occurrences clamp
/// to the last valid day of that month instead of rolling over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub day_of_month: Option<u32>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            day_of_month: None,
        }
    }

    pub fn monthly_on(day_of_month: u32) -> Self {
        Self {
            frequency: Frequency::Monthly,
            day_of_month: Some(day_of_month),
        }
    }
}

/// Distinguishes a repeating bill from a one-off reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObligationKind {
    Recurring,
    Reminder,
}

/// A recurring bill or one-off reminder that has not yet been realized as an
/// actual ledger expense.
///
/// A `Recurring` obligation always carries a recurrence rule, a next due date
/// and a series end date; a `Reminder` always carries a single
/// `occurrence_date`. `is_projected` stays true until the due-date arrival
/// process (or an explicit payment) turns the obligation into a real ledger
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: i64,
    pub owner_user_id: i64,
    pub description: String,
    /// The value of each occurrence. Always non-negative.
    pub amount: Decimal,
    pub category_id: i64,
    pub kind: ObligationKind,
    pub is_active: bool,
    pub is_settled: bool,
    pub is_projected: bool,
    /// The single date of a reminder. None for recurring obligations.
    pub occurrence_date: Option<NaiveDate>,
    /// The schedule of a recurring obligation. None for reminders.
    pub recurrence: Option<RecurrenceRule>,
    /// The date of the next expected occurrence of a recurring obligation.
    pub next_due_date: Option<NaiveDate>,
    /// The date of the last occurrence of a recurring obligation.
    pub series_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Obligation {
    pub fn is_recurring(&self) -> bool {
        self.kind == ObligationKind::Recurring
    }

    pub fn is_reminder(&self) -> bool {
        self.kind == ObligationKind::Reminder
    }
}
