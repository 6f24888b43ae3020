//! Task creation and status changes.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{CrmDb, DbNotification, DbTask};
use crate::error::AppError;
use crate::types::{NotificationCategory, Priority, TaskStatus};
use crate::util::{validate_bounded_string, validate_enum_string, validate_id, validate_yyyy_mm_dd};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Assignee; defaults to the caller. Assigning to someone else notifies
    /// them.
    #[serde(default)]
    pub assignee_id: Option<String>,
}

/// Create a task owned by `input.assignee_id` (the caller when absent).
pub fn create_task(db: &CrmDb, caller_id: &str, input: &TaskInput) -> Result<DbTask, AppError> {
    let title = validate_bounded_string(&input.title, "title", 1, 200)?;
    if let Some(date) = &input.due_date {
        validate_yyyy_mm_dd(date, "dueDate")?;
    }
    let priority = match input.priority.as_deref() {
        Some(p) => {
            validate_enum_string(
                p,
                "priority",
                &[
                    Priority::Low.as_str(),
                    Priority::Medium.as_str(),
                    Priority::High.as_str(),
                ],
            )?;
            p.to_string()
        }
        None => Priority::Medium.as_str().to_string(),
    };
    let assignee = match input.assignee_id.as_deref() {
        Some(id) => {
            validate_id(id, "assigneeId")?;
            db.get_user(id)?
                .ok_or_else(|| AppError::NotFound("User".to_string()))?
                .id
        }
        None => caller_id.to_string(),
    };

    let now = Utc::now().to_rfc3339();
    let task = DbTask {
        id: Uuid::new_v4().to_string(),
        user_id: assignee.clone(),
        client_id: input.client_id.clone(),
        title,
        description: input.description.clone(),
        due_date: input.due_date.clone(),
        priority,
        status: TaskStatus::Todo.as_str().to_string(),
        completed_at: None,
        created_at: now.clone(),
        updated_at: now.clone(),
    };

    db.with_transaction(|db| {
        db.upsert_task(&task)?;
        if assignee != caller_id {
            db.insert_notification(&DbNotification {
                id: Uuid::new_v4().to_string(),
                user_id: assignee.clone(),
                category: NotificationCategory::TaskAssigned.as_str().to_string(),
                title: format!("New task: {}", task.title),
                body: task.due_date.as_deref().map(|d| format!("Due {d}")),
                task_id: Some(task.id.clone()),
                metadata: Some(format!(r#"{{"url":"/tasks/{}"}}"#, task.id)),
                read_at: None,
                created_at: now.clone(),
            })?;
        }
        Ok(())
    })?;

    Ok(task)
}

/// Change a task's status. Returns the updated row.
pub fn set_status(
    db: &CrmDb,
    user_id: &str,
    task_id: &str,
    status_code: &str,
) -> Result<DbTask, AppError> {
    let status = TaskStatus::parse(status_code).ok_or_else(|| {
        AppError::validation(format!("Unknown task status: {status_code}"))
    })?;

    if !db.set_task_status(user_id, task_id, status.as_str())? {
        return Err(AppError::NotFound("Task".to_string()));
    }
    db.get_task(user_id, task_id)?
        .ok_or_else(|| AppError::NotFound("Task".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_user, test_db};

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            client_id: None,
            due_date: None,
            priority: None,
            assignee_id: None,
        }
    }

    #[test]
    fn test_create_task_defaults() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let task = create_task(&db, &user, &input("  Call the lender  ")).expect("create");
        assert_eq!(task.title, "Call the lender");
        assert_eq!(task.priority, "medium");
        assert_eq!(task.status, "todo");
        assert_eq!(task.user_id, "u1");

        // Self-assigned tasks do not notify
        assert_eq!(db.count_unread_notifications(&user).expect("count"), 0);
    }

    #[test]
    fn test_create_task_rejects_bad_due_date() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut bad = input("Call the lender");
        bad.due_date = Some("06/01/2026".to_string());
        assert!(matches!(
            create_task(&db, &user, &bad),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_assigning_to_another_user_notifies_them() {
        let db = test_db();
        let caller = seed_user(&db, "u1", "a@porchlight.test");
        let assignee = seed_user(&db, "u2", "b@porchlight.test");

        let mut assigned = input("Prep the open house");
        assigned.assignee_id = Some(assignee.clone());
        let task = create_task(&db, &caller, &assigned).expect("create");
        assert_eq!(task.user_id, "u2");

        assert_eq!(db.count_unread_notifications(&assignee).expect("count"), 1);
        let found = db
            .find_unread_task_notification(&assignee, &task.id)
            .expect("query");
        // task_assigned rows are not due/overdue rows; the dedup lookup
        // ignores them
        assert!(found.is_none());
    }

    #[test]
    fn test_assigning_to_unknown_user_is_not_found() {
        let db = test_db();
        let caller = seed_user(&db, "u1", "a@porchlight.test");

        let mut assigned = input("Prep the open house");
        assigned.assignee_id = Some("ghost".to_string());
        assert!(matches!(
            create_task(&db, &caller, &assigned),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_status_validates_and_scopes() {
        let db = test_db();
        let user = seed_user(&db, "u1", "a@porchlight.test");
        seed_user(&db, "u2", "b@porchlight.test");
        let task = create_task(&db, &user, &input("Wrap up")).expect("create");

        assert!(matches!(
            set_status(&db, &user, &task.id, "done"),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            set_status(&db, "u2", &task.id, "closed"),
            Err(AppError::NotFound(_))
        ));

        let updated = set_status(&db, &user, &task.id, "closed").expect("close");
        assert_eq!(updated.status, "closed");
        assert!(updated.completed_at.is_some());
    }
}
