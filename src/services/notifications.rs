//! Lazy notification evaluation for due and overdue tasks.
//!
//! Nothing schedules notifications ahead of time. When a feed is requested,
//! the caller kicks off an evaluation pass that inspects the user's open
//! tasks and materializes any missing due / overdue rows. Dedup is a lookup
//! before insert keyed on `task_id`, which gives at-least-once semantics:
//! concurrent passes can both miss the lookup and insert twice, and a read
//! notification can be re-created while the task stays open. Duplicates are
//! tolerated by the feed rather than prevented.

use std::path::PathBuf;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::{CrmDb, DbError, DbNotification, DbTask};
use crate::types::NotificationCategory;

/// Scan a user's open tasks and insert a notification for each task due on or
/// before `today` that has no unread task notification yet. Returns the number
/// of rows created.
pub fn evaluate_due_tasks(
    db: &CrmDb,
    user_id: &str,
    today: NaiveDate,
) -> Result<usize, DbError> {
    let date = today.format("%Y-%m-%d").to_string();
    let tasks = db.get_due_open_tasks(user_id, &date)?;

    let mut created = 0;
    for task in &tasks {
        if db.find_unread_task_notification(user_id, &task.id)?.is_some() {
            continue;
        }
        db.insert_notification(&build_task_notification(task, today))?;
        created += 1;
    }

    if created > 0 {
        tracing::info!(user_id, created, "materialized task notifications");
    }
    Ok(created)
}

/// Run an evaluation pass off the request path.
///
/// Opens its own connection from `db_path` so the request handle is not held
/// across the scan. Failures are logged, never surfaced; the feed the caller
/// is about to read simply misses this pass and catches up on the next one.
pub fn spawn_evaluation(
    db_path: PathBuf,
    user_id: String,
    today: NaiveDate,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let db = match CrmDb::open_at(&db_path) {
            Ok(db) => db,
            Err(e) => {
                tracing::warn!("notification evaluation skipped, open failed: {e}");
                return;
            }
        };
        if let Err(e) = evaluate_due_tasks(&db, &user_id, today) {
            tracing::warn!("notification evaluation failed: {e}");
        }
    })
}

fn build_task_notification(task: &DbTask, today: NaiveDate) -> DbNotification {
    let due = task
        .due_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let category = match due {
        Some(d) if d < today => NotificationCategory::TaskOverdue,
        _ => NotificationCategory::TaskDue,
    };
    let title = match category {
        NotificationCategory::TaskOverdue => format!("Overdue: {}", task.title),
        _ => format!("Due today: {}", task.title),
    };
    DbNotification {
        id: Uuid::new_v4().to_string(),
        user_id: task.user_id.clone(),
        category: category.as_str().to_string(),
        title,
        body: task.due_date.as_deref().map(|d| format!("Due {d}")),
        task_id: Some(task.id.clone()),
        metadata: Some(format!(r#"{{"url":"/tasks/{}"}}"#, task.id)),
        read_at: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{sample_task, seed_user, test_db};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
    }

    fn unread_for(db: &CrmDb, user: &str) -> Vec<DbNotification> {
        db.get_notifications(
            user,
            &crate::db::notifications::NotificationFilter {
                read: Some(false),
                limit: 50,
                ..Default::default()
            },
        )
        .expect("feed")
        .items
    }

    #[test]
    fn test_overdue_task_gets_exactly_one_notification() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut task = sample_task("t1", &user, "Chase the appraisal");
        task.due_date = Some("2026-05-20".to_string());
        db.upsert_task(&task).expect("upsert");

        let created = evaluate_due_tasks(&db, &user, today()).expect("eval");
        assert_eq!(created, 1);

        let feed = unread_for(&db, &user);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].category, "task_overdue");
        assert_eq!(feed[0].task_id.as_deref(), Some("t1"));
        assert_eq!(feed[0].title, "Overdue: Chase the appraisal");
    }

    #[test]
    fn test_due_today_is_categorized_due_not_overdue() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut task = sample_task("t1", &user, "Send disclosures");
        task.due_date = Some("2026-06-01".to_string());
        db.upsert_task(&task).expect("upsert");

        evaluate_due_tasks(&db, &user, today()).expect("eval");
        let feed = unread_for(&db, &user);
        assert_eq!(feed[0].category, "task_due");
    }

    #[test]
    fn test_second_pass_creates_nothing_while_unread() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut task = sample_task("t1", &user, "Chase the appraisal");
        task.due_date = Some("2026-05-20".to_string());
        db.upsert_task(&task).expect("upsert");

        assert_eq!(evaluate_due_tasks(&db, &user, today()).expect("first"), 1);
        assert_eq!(evaluate_due_tasks(&db, &user, today()).expect("second"), 0);
        assert_eq!(unread_for(&db, &user).len(), 1);
    }

    #[test]
    fn test_read_notification_is_recreated_while_task_open() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut task = sample_task("t1", &user, "Chase the appraisal");
        task.due_date = Some("2026-05-20".to_string());
        db.upsert_task(&task).expect("upsert");

        evaluate_due_tasks(&db, &user, today()).expect("first");
        db.mark_all_notifications_read(&user).expect("read");

        // The task is still open and overdue, so the next pass re-notifies
        assert_eq!(evaluate_due_tasks(&db, &user, today()).expect("second"), 1);
    }

    #[test]
    fn test_closed_and_future_tasks_are_ignored() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let mut closed = sample_task("t1", &user, "Already done");
        closed.due_date = Some("2026-05-20".to_string());
        closed.status = "closed".to_string();
        db.upsert_task(&closed).expect("upsert");

        let mut future = sample_task("t2", &user, "Next week");
        future.due_date = Some("2026-06-08".to_string());
        db.upsert_task(&future).expect("upsert");

        db.upsert_task(&sample_task("t3", &user, "No due date"))
            .expect("upsert");

        assert_eq!(evaluate_due_tasks(&db, &user, today()).expect("eval"), 0);
    }

    #[test]
    fn test_evaluation_is_user_scoped() {
        let db = test_db();
        let a = seed_user(&db, "u1", "a@porchlight.test");
        let b = seed_user(&db, "u2", "b@porchlight.test");

        let mut task = sample_task("t1", &b, "Someone else's work");
        task.due_date = Some("2026-05-20".to_string());
        db.upsert_task(&task).expect("upsert");

        assert_eq!(evaluate_due_tasks(&db, &a, today()).expect("eval"), 0);
        assert!(unread_for(&db, &a).is_empty());
    }
}
