use std::sync::Arc;

use axum::extract::State;

use crate::api::extract::{JsonBody, QueryFilter, ResourceId};
use crate::api::response::ApiResponse;
use crate::context::RequestScope;
use crate::errors::AppError;
use crate::models::task::{NewTask, Task, TaskFilter, TaskUpdate};
use crate::AppState;

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
    QueryFilter(filter): QueryFilter<TaskFilter>,
) -> Result<ApiResponse<Vec<Task>>, AppError> {
    filter.validate()?;
    let tasks = state.db.list_tasks(&scope, &filter).await?;
    Ok(ApiResponse::ok(tasks))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
    JsonBody(new): JsonBody<NewTask>,
) -> Result<ApiResponse<Task>, AppError> {
    new.validate()?;
    let task = state.db.create_task(&scope, new).await?;
    Ok(ApiResponse::created(task))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<ApiResponse<Task>, AppError> {
    let task = state.db.get_task(&scope, id).await?;
    Ok(ApiResponse::ok(task))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
    ResourceId(id): ResourceId,
    JsonBody(patch): JsonBody<TaskUpdate>,
) -> Result<ApiResponse<Task>, AppError> {
    patch.validate()?;
    let task = state.db.update_task(&scope, id, patch).await?;
    Ok(ApiResponse::ok(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<ApiResponse<()>, AppError> {
    state.db.delete_task(&scope, id).await?;
    Ok(ApiResponse::empty())
}
