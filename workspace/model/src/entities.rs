pub mod budget;
pub mod category;
pub mod expense;
pub mod insight;
pub mod obligation;
pub mod user;

pub use budget::{GlobalMonthBudget, UserCategoryBudget, UserCategoryMonthBudget};
pub use category::Category;
pub use expense::ExpenseRecord;
pub use insight::{
    Anomalies, CategoryAnomaly, CategoryDelta, CategoryInsights, CategoryProfile, InsightData,
    InsightEntry, InsightKey, InsightPhase, MonthComparison, MonthOverMonth, PaceAlert,
    VolatilityBand, WeightedForecast,
};
pub use obligation::{Frequency, Obligation, ObligationKind, RecurrenceRule};
pub use user::User;
