use std::sync::Arc;

use anyhow::anyhow;
use time::{Date, Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateExpenseRequest, ListExpensesQuery, UpdateExpenseRequest};
use super::repo::ExpenseRepository;
use super::repo_types::{Expense, NewExpense};
use crate::error::{AppError, AppResult};
use crate::timestamp::millis;
use crate::validation::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    LastWeek,
    LastMonth,
    Last3Month,
    Custom,
}

impl DateFilter {
    /// Unknown or empty names mean "no filter".
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "last_week" => Some(Self::LastWeek),
            "last_month" => Some(Self::LastMonth),
            "last_3_month" => Some(Self::Last3Month),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Inclusive `[start, end]` window in unix millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DateWindow {
    pub fn resolve(
        filter: DateFilter,
        start_date: &str,
        end_date: &str,
        now: OffsetDateTime,
    ) -> AppResult<Self> {
        let (start, end) = match filter {
            DateFilter::LastWeek => (now - Duration::days(7), now),
            DateFilter::LastMonth => (months_before(now, 1), now),
            DateFilter::Last3Month => (months_before(now, 3), now),
            DateFilter::Custom => {
                let start = parse_custom("start_date", start_date)?;
                let end = parse_custom("end_date", end_date)?;
                if start > end {
                    return Err(AppError::bad_request("start_date must not be after end_date")
                        .with_cause(anyhow!("custom range {} > {}", start, end)));
                }
                (
                    start.midnight().assume_utc(),
                    end.midnight().assume_utc() + Duration::days(1) - Duration::milliseconds(1),
                )
            }
        };
        Ok(Self {
            start_ms: millis(start),
            end_ms: millis(end),
        })
    }
}

fn parse_custom(field: &'static str, raw: &str) -> AppResult<Date> {
    parse_date(raw).map_err(|e| {
        AppError::internal(anyhow::Error::new(e).context(format!("parse {} {:?}", field, raw)))
    })
}

/// Same wall-clock time `months` calendar months earlier, clamped to the
/// last day of the target month.
fn months_before(at: OffsetDateTime, months: u8) -> OffsetDateTime {
    let date = at.date();
    let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - i32::from(months);
    let year = index.div_euclid(12);
    let month = time::Month::January.nth_next(index.rem_euclid(12) as u8);
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).map_or(at, |d| at.replace_date(d))
}

#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseRepository>,
}

impl ExpenseService {
    pub fn new(expenses: Arc<dyn ExpenseRepository>) -> Self {
        Self { expenses }
    }

    #[instrument(skip(self, req))]
    pub async fn insert(&self, user_id: Uuid, req: CreateExpenseRequest) -> AppResult<Expense> {
        let amount = req
            .amount
            .ok_or_else(|| AppError::internal(anyhow!("insert called without amount")))?;
        let expense = self
            .expenses
            .create(NewExpense {
                user_id,
                description: normalize(&req.description),
                amount,
                category: normalize(&req.category),
            })
            .await
            .map_err(|e| AppError::internal(e.context("ExpenseService.insert")))?;
        info!(expense_id = %expense.id, %user_id, "expense created");
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid, user_id: Uuid) -> AppResult<Expense> {
        self.expenses
            .find_by_id_and_user(id, user_id)
            .await
            .map_err(|e| AppError::internal(e.context("ExpenseService.get_by_id")))?
            .ok_or_else(|| AppError::not_found(anyhow!("expense {} not found for user {}", id, user_id)))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: UpdateExpenseRequest,
    ) -> AppResult<Expense> {
        let mut expense = self.get_by_id(id, user_id).await?;
        if !patch.description.trim().is_empty() {
            expense.description = normalize(&patch.description);
        }
        if !patch.category.trim().is_empty() {
            expense.category = normalize(&patch.category);
        }
        if let Some(amount) = patch.amount {
            expense.amount = amount;
        }

        self.expenses
            .update(&expense)
            .await
            .map_err(|e| AppError::internal(e.context("ExpenseService.update")))?
            .ok_or_else(|| AppError::not_found(anyhow!("expense {} vanished during update", id)))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.get_by_id(id, user_id).await?;
        let deleted = self
            .expenses
            .soft_delete(id, user_id)
            .await
            .map_err(|e| AppError::internal(e.context("ExpenseService.delete")))?;
        if !deleted {
            return Err(AppError::not_found(anyhow!("expense {} already deleted", id)));
        }
        info!(expense_id = %id, %user_id, "expense deleted");
        Ok(())
    }

    /// One page of the caller's expenses plus the total matching count.
    #[instrument(skip(self, query))]
    pub async fn get_all(
        &self,
        user_id: Uuid,
        query: &ListExpensesQuery,
    ) -> AppResult<(Vec<Expense>, i64)> {
        self.get_all_at(user_id, query, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn get_all_at(
        &self,
        user_id: Uuid,
        query: &ListExpensesQuery,
        now: OffsetDateTime,
    ) -> AppResult<(Vec<Expense>, i64)> {
        let (offset, limit) = (query.offset(), query.limit());
        let result = match DateFilter::parse(&query.filter) {
            Some(filter) => {
                let window = DateWindow::resolve(filter, &query.start_date, &query.end_date, now)?;
                self.expenses
                    .find_all_by_date_range(user_id, window.start_ms, window.end_ms, offset, limit)
                    .await
            }
            None => self.expenses.find_all(user_id, offset, limit).await,
        };
        result.map_err(|e| AppError::internal(e.context("ExpenseService.get_all")))
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
