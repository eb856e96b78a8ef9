use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateExpenseRequest, ListExpensesQuery, UpdateExpenseRequest};
use super::repo_types::Expense;
use crate::auth::extractors::{require_auth, AuthUser};
use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{parse_id, ValidJson, ValidQuery};

pub fn expense_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses))
        .route("/expenses/create", post(create_expense))
        .route(
            "/expenses/:id",
            get(get_expense).patch(update_expense).delete(delete_expense),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Expense>>)> {
    let expense = state.expenses.insert(user.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED, expense)),
    ))
}

#[instrument(skip(state, query), fields(user_id = %user.id))]
pub async fn list_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<ListExpensesQuery>,
) -> AppResult<Json<ApiResponse<Vec<Expense>>>> {
    let (items, total) = state.expenses.get_all(user.id, &query).await?;
    Ok(Json(ApiResponse::paginated(
        items,
        query.page(),
        query.limit(),
        total,
    )))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn get_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let id = parse_id("id", &id)?;
    let expense = state.expenses.get_by_id(id, user.id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK, expense)))
}

#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn update_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateExpenseRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Expense>>)> {
    let id = parse_id("id", &id)?;
    let expense = state.expenses.update(id, user.id, body).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(StatusCode::ACCEPTED, expense)),
    ))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id("id", &id)?;
    state.expenses.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
