use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{FieldErrors, MSG_NEGATIVE};
use crate::errors::AppError;
use crate::field::OptionalField;

pub const SUBJECT_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors.text("subject", &self.subject, SUBJECT_MAX_LEN);
        if let Some(description) = &self.description {
            errors.check(
                "description",
                description.chars().count() <= DESCRIPTION_MAX_LEN,
                format!("The length must be no more than {}.", DESCRIPTION_MAX_LEN),
            );
        }
        errors.finish()
    }
}

/// Body of `PATCH /tasks/:id`. Absent keys leave the column untouched; an
/// explicit null clears `description` or `due_date` and is rejected on the
/// non-nullable columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub subject: OptionalField<String>,
    #[serde(default)]
    pub description: OptionalField<String>,
    #[serde(default)]
    pub priority: OptionalField<i32>,
    #[serde(default)]
    pub due_date: OptionalField<DateTime<Utc>>,
    #[serde(default)]
    pub completed: OptionalField<bool>,
}

impl TaskUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors
            .not_null("subject", &self.subject)
            .not_null("priority", &self.priority)
            .not_null("completed", &self.completed);
        if let Some(subject) = self.subject.value() {
            errors.text("subject", subject, SUBJECT_MAX_LEN);
        }
        if let Some(description) = self.description.value() {
            errors.check(
                "description",
                description.chars().count() <= DESCRIPTION_MAX_LEN,
                format!("The length must be no more than {}.", DESCRIPTION_MAX_LEN),
            );
        }
        errors.finish()
    }

    /// True when no key was present, i.e. the patch cannot change anything.
    pub fn is_empty(&self) -> bool {
        !(self.subject.is_defined()
            || self.description.is_defined()
            || self.priority.is_defined()
            || self.due_date.is_defined()
            || self.completed.is_defined())
    }

    /// Merge the patch over the stored row.
    pub fn apply_to(self, stored: Task, now: DateTime<Utc>) -> Task {
        Task {
            subject: self.subject.value_or(stored.subject),
            description: self.description.nullable_or(stored.description),
            priority: self.priority.value_or(stored.priority),
            due_date: self.due_date.nullable_or(stored.due_date),
            completed: self.completed.value_or(stored.completed),
            updated_at: now,
            ..stored
        }
    }
}

/// Query string of `GET /tasks`. `due_date=null` selects tasks without a due
/// date; a date selects tasks due on that UTC calendar day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub priority: OptionalField<i32>,
    #[serde(default)]
    pub completed: OptionalField<bool>,
    #[serde(default)]
    pub due_date: OptionalField<NaiveDate>,
    #[serde(default)]
    pub offset: i64,
    /// 0 means no limit.
    #[serde(default)]
    pub limit: i64,
}

impl TaskFilter {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldErrors::new()
            .not_null("priority", &self.priority)
            .not_null("completed", &self.completed)
            .check("offset", self.offset >= 0, MSG_NEGATIVE)
            .check("limit", self.limit >= 0, MSG_NEGATIVE)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::query::from_query_str;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn stored() -> Task {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            subject: "write report".into(),
            description: Some("quarterly numbers".into()),
            priority: 2,
            due_date: Some(created + Duration::days(7)),
            completed: false,
            created_at: created,
            updated_at: created,
        }
    }

    fn patch(value: serde_json::Value) -> TaskUpdate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_touches_only_present_keys() {
        let task = stored();
        let now = Utc::now();
        let merged = patch(json!({"completed": true})).apply_to(task.clone(), now);
        assert!(merged.completed);
        assert_eq!(merged.subject, task.subject);
        assert_eq!(merged.description, task.description);
        assert_eq!(merged.priority, task.priority);
        assert_eq!(merged.due_date, task.due_date);
        assert_eq!(merged.created_at, task.created_at);
        assert_eq!(merged.updated_at, now);
    }

    #[test]
    fn test_merge_null_clears_nullable_columns() {
        let task = stored();
        let merged =
            patch(json!({"description": null, "due_date": null})).apply_to(task.clone(), Utc::now());
        assert_eq!(merged.description, None);
        assert_eq!(merged.due_date, None);
        assert_eq!(merged.subject, task.subject);
    }

    #[test]
    fn test_merge_sets_values() {
        let merged = patch(json!({"subject": "ship it", "priority": 0, "description": "done"}))
            .apply_to(stored(), Utc::now());
        assert_eq!(merged.subject, "ship it");
        assert_eq!(merged.priority, 0);
        assert_eq!(merged.description.as_deref(), Some("done"));
    }

    #[test]
    fn test_update_rejects_null_on_non_nullable() {
        let err = patch(json!({"subject": null, "priority": null, "completed": null}))
            .validate()
            .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields["subject"], "Cannot be null.");
                assert_eq!(fields["priority"], "Cannot be null.");
                assert_eq!(fields["completed"], "Cannot be null.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_update_rejects_blank_subject() {
        let err = patch(json!({"subject": "  "})).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f["subject"] == "Cannot be blank."));
    }

    #[test]
    fn test_empty_patch() {
        assert!(patch(json!({})).is_empty());
        assert!(!patch(json!({"description": null})).is_empty());
        assert!(patch(json!({})).validate().is_ok());
    }

    #[test]
    fn test_new_task_requires_subject() {
        let task: NewTask = serde_json::from_value(json!({"priority": 1})).unwrap();
        let err = task.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains_key("subject")));
    }

    #[test]
    fn test_new_task_defaults() {
        let task: NewTask = serde_json::from_value(json!({"subject": "x"})).unwrap();
        assert!(task.validate().is_ok());
        assert_eq!(task.priority, 0);
        assert!(!task.completed);
        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
    }

    #[test]
    fn test_filter_from_query() {
        let filter: TaskFilter = from_query_str("due_date=null&completed=false&limit=5").unwrap();
        assert!(filter.due_date.is_null());
        assert_eq!(filter.completed, OptionalField::Value(false));
        assert_eq!(filter.limit, 5);
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_filter_validation() {
        let filter: TaskFilter = from_query_str("offset=-1&priority=null").unwrap();
        match filter.validate().unwrap_err() {
            AppError::Validation(fields) => {
                assert_eq!(fields["offset"], "Must be no less than 0.");
                assert_eq!(fields["priority"], "Cannot be null.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
