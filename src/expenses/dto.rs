use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{Reason, SubError};
use crate::validation::{Validate, Validator};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// POST /expenses/create body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateExpenseRequest {
    pub description: String,
    pub amount: Option<Decimal>,
    pub category: String,
}

impl Validate for CreateExpenseRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.field("description", &self.description).required().max_len(200);
        v.amount("amount", self.amount, true);
        v.field("category", &self.category).required().max_len(100);
        v.finish()
    }
}

/// PATCH /expenses/:id body. Empty strings and a missing amount leave the
/// stored value untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateExpenseRequest {
    pub description: String,
    pub amount: Option<Decimal>,
    pub category: String,
}

impl Validate for UpdateExpenseRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.optional("description", &self.description).max_len(200);
        v.amount("amount", self.amount, false);
        v.optional("category", &self.category).max_len(100);
        v.finish()
    }
}

/// GET /expenses query string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListExpensesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub filter: String,
    pub start_date: String,
    pub end_date: String,
}

impl ListExpensesQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

impl Validate for ListExpensesQuery {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        if let Some(page) = self.page {
            v.range("page", page, 1, i64::MAX / MAX_LIMIT);
        }
        if let Some(limit) = self.limit {
            v.range("limit", limit, 1, MAX_LIMIT);
        }
        v.optional("filter", &self.filter)
            .one_of(&["last_week", "last_month", "last_3_month", "custom"]);
        v.optional("start_date", &self.start_date).date();
        v.optional("end_date", &self.end_date).date();
        if self.filter == "custom" {
            if self.start_date.is_empty() {
                v.push(SubError::new("start_date", "", Reason::Required));
            }
            if self.end_date.is_empty() {
                v.push(SubError::new("end_date", "", Reason::Required));
            }
        }
        v.finish()
    }
}
