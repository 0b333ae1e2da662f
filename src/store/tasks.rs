//! Task persistence, scoped to the calling user.
//!
//! Mutations follow one shape: open a transaction, lock the row with
//! `SELECT ... FOR UPDATE`, check that the caller owns it, write, commit.
//! Concurrent writers to the same task therefore serialize on the lock and
//! each one merges over the state the previous one committed.
//!
//! Every early return drops the open transaction, which rolls it back.

use chrono::{SubsecRound, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::context::RequestScope;
use crate::errors::AppError;
use crate::field::OptionalField;
use crate::models::task::{NewTask, Task, TaskFilter, TaskUpdate};

const TASK_COLUMNS: &str =
    "id, user_id, subject, description, priority, due_date, completed, created_at, updated_at";

impl PgStore {
    pub async fn create_task(&self, scope: &RequestScope, new: NewTask) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"INSERT INTO tasks (id, user_id, subject, description, priority, due_date, completed)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(scope.user_id())
        .bind(&new.subject)
        .bind(&new.description)
        .bind(new.priority)
        .bind(new.due_date)
        .bind(new.completed)
        .fetch_one(self.pool())
        .await?;

        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Read one task. Reports `PermissionDenied` when the row exists but
    /// belongs to someone else.
    pub async fn get_task(&self, scope: &RequestScope, id: Uuid) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(AppError::NotFound(id))?;

        if !scope.owns(task.user_id) {
            return Err(AppError::PermissionDenied);
        }
        Ok(task)
    }

    /// The caller's tasks matching `filter`, oldest first.
    pub async fn list_tasks(
        &self,
        scope: &RequestScope,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "));
        qb.push_bind(scope.user_id());

        if let Some(priority) = filter.priority.value() {
            qb.push(" AND priority = ").push_bind(*priority);
        }
        if let Some(completed) = filter.completed.value() {
            qb.push(" AND completed = ").push_bind(*completed);
        }
        match &filter.due_date {
            OptionalField::Absent => {}
            OptionalField::Null => {
                qb.push(" AND due_date IS NULL");
            }
            OptionalField::Value(day) => {
                qb.push(" AND (due_date AT TIME ZONE 'UTC')::date = ")
                    .push_bind(*day);
            }
        }

        qb.push(" ORDER BY created_at ASC, id ASC");
        if filter.limit > 0 {
            qb.push(" LIMIT ").push_bind(filter.limit);
        }
        if filter.offset > 0 {
            qb.push(" OFFSET ").push_bind(filter.offset);
        }

        let tasks = qb.build_query_as::<Task>().fetch_all(self.pool()).await?;
        Ok(tasks)
    }

    /// Apply a partial update under a row lock and return the merged task.
    ///
    /// A patch with no keys still takes the lock and checks ownership, but
    /// writes nothing and leaves `updated_at` alone.
    pub async fn update_task(
        &self,
        scope: &RequestScope,
        id: Uuid,
        patch: TaskUpdate,
    ) -> Result<Task, AppError> {
        let mut tx = self.begin_locking().await?;
        let stored = lock_owned_task(&mut tx, scope, id).await?;

        if patch.is_empty() {
            tx.commit().await?;
            return Ok(stored);
        }

        // Postgres keeps microseconds; match it so the returned task equals
        // what a later read sees.
        let task = patch.apply_to(stored, Utc::now().trunc_subsecs(6));
        let result = sqlx::query(
            r#"UPDATE tasks
               SET subject = $2, description = $3, priority = $4, due_date = $5,
                   completed = $6, updated_at = $7
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&task.subject)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.completed)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(id));
        }

        tx.commit().await?;
        tracing::info!(task_id = %id, "task updated");
        Ok(task)
    }

    /// Delete a task under a row lock.
    pub async fn delete_task(&self, scope: &RequestScope, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.begin_locking().await?;
        lock_owned_task(&mut tx, scope, id).await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(id));
        }

        tx.commit().await?;
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }
}

/// Lock the row for the rest of the transaction and check ownership.
async fn lock_owned_task(
    conn: &mut PgConnection,
    scope: &RequestScope,
    id: Uuid,
) -> Result<Task, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound(id))?;

    if !scope.owns(task.user_id) {
        tracing::warn!(task_id = %id, owner = %task.user_id, "refusing write to a task owned by another user");
        return Err(AppError::PermissionDenied);
    }
    Ok(task)
}
