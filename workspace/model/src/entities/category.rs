use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A spending category.
///
/// A shared category is visible to and counted against every household
/// member jointly; a personal category belongs to individual envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub is_shared: bool,
    /// The household-wide limit of a shared category. Only consulted when
    /// `is_shared` is true.
    pub global_limit: Option<Decimal>,
}
