use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Expense record. Rows with `deleted_at` set are invisible to every read.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal, // serialized as a string, e.g. "42.50"
    pub category: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing)]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
}
