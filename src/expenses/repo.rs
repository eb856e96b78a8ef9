use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Expense, NewExpense};
use crate::timestamp::now_millis;

/// Every read and write is scoped by owner, and soft-deleted rows are
/// excluded from all of them.
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create(&self, expense: NewExpense) -> anyhow::Result<Expense>;
    async fn find_by_id_and_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Expense>>;
    async fn update(&self, expense: &Expense) -> anyhow::Result<Option<Expense>>;
    /// `false` when no live row matched.
    async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    async fn find_all(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<Expense>, i64)>;
    /// Rows with `start_ms <= created_at <= end_ms`, newest first.
    async fn find_all_by_date_range(
        &self,
        user_id: Uuid,
        start_ms: i64,
        end_ms: i64,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<Expense>, i64)>;
}

#[derive(Clone)]
pub struct PgExpenseRepository {
    db: PgPool,
}

impl PgExpenseRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const EXPENSE_COLUMNS: &str =
    "id, user_id, description, amount, category, created_at, updated_at, deleted_at";

#[async_trait]
impl ExpenseRepository for PgExpenseRepository {
    async fn create(&self, expense: NewExpense) -> anyhow::Result<Expense> {
        let sql = format!(
            r#"
            INSERT INTO expenses (id, user_id, description, amount, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {EXPENSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(Uuid::new_v4())
            .bind(expense.user_id)
            .bind(&expense.description)
            .bind(expense.amount)
            .bind(&expense.category)
            .bind(now_millis())
            .fetch_one(&self.db)
            .await
            .context("PgExpenseRepository.create")
    }

    async fn find_by_id_and_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("PgExpenseRepository.find_by_id_and_user")
    }

    async fn update(&self, expense: &Expense) -> anyhow::Result<Option<Expense>> {
        let sql = format!(
            r#"
            UPDATE expenses
            SET description = $3, amount = $4, category = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING {EXPENSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(expense.id)
            .bind(expense.user_id)
            .bind(&expense.description)
            .bind(expense.amount)
            .bind(&expense.category)
            .bind(now_millis())
            .fetch_optional(&self.db)
            .await
            .context("PgExpenseRepository.update")
    }

    async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let now = now_millis();
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(&self.db)
        .await
        .context("PgExpenseRepository.soft_delete")?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_all(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<Expense>, i64)> {
        let sql = format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, Expense>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .context("PgExpenseRepository.find_all")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM expenses WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("PgExpenseRepository.find_all: count")?;

        Ok((rows, total))
    }

    async fn find_all_by_date_range(
        &self,
        user_id: Uuid,
        start_ms: i64,
        end_ms: i64,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<Expense>, i64)> {
        let sql = format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE user_id = $1 AND deleted_at IS NULL
              AND created_at BETWEEN $2 AND $3
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, Expense>(&sql)
            .bind(user_id)
            .bind(start_ms)
            .bind(end_ms)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .context("PgExpenseRepository.find_all_by_date_range")?;

        // Not in one snapshot with the page query; concurrent writes can skew the total.
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM expenses
            WHERE user_id = $1 AND deleted_at IS NULL
              AND created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(start_ms)
        .bind(end_ms)
        .fetch_one(&self.db)
        .await
        .context("PgExpenseRepository.find_all_by_date_range: count")?;

        Ok((rows, total))
    }
}
