use chrono::Utc;
use rusqlite::params;

use super::*;

/// Filters for the notification feed. `cursor` is the id of the last row of
/// the previous page.
#[derive(Debug, Default, Clone)]
pub struct NotificationFilter {
    pub category: Option<String>,
    pub read: Option<bool>,
    pub limit: usize,
    pub cursor: Option<String>,
}

/// One page of the feed. `next_cursor` is present when another page may exist.
#[derive(Debug)]
pub struct NotificationPage {
    pub items: Vec<DbNotification>,
    pub next_cursor: Option<String>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, category, title, body, task_id, metadata, read_at, created_at";

impl CrmDb {
    /// Insert a notification row.
    pub fn insert_notification(&self, notification: &DbNotification) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO notifications (
                id, user_id, category, title, body, task_id, metadata, read_at, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                notification.id,
                notification.user_id,
                notification.category,
                notification.title,
                notification.body,
                notification.task_id,
                notification.metadata,
                notification.read_at,
                notification.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a notification by id, scoped to its owner.
    pub fn get_notification(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<DbNotification>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE id = ?1 AND user_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![id, user_id], Self::map_notification_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Keyset-paginated feed, newest first. Ordering key is
    /// `(created_at, id)` descending so rows sharing a timestamp page
    /// deterministically.
    pub fn get_notifications(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, DbError> {
        // Resolve the cursor row first; an unknown cursor reads from the top.
        let anchor = match &filter.cursor {
            Some(id) => self.get_notification(user_id, id)?,
            None => None,
        };
        let (anchor_created, anchor_id) = match &anchor {
            Some(n) => (Some(n.created_at.clone()), Some(n.id.clone())),
            None => (None, None),
        };

        let limit = filter.limit.clamp(1, 100) as i64;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1
               AND (?2 IS NULL OR category = ?2)
               AND (?3 IS NULL
                    OR (?3 = 1 AND read_at IS NOT NULL)
                    OR (?3 = 0 AND read_at IS NULL))
               AND (?4 IS NULL
                    OR created_at < ?4
                    OR (created_at = ?4 AND id < ?5))
             ORDER BY created_at DESC, id DESC
             LIMIT ?6"
        ))?;
        let read_flag: Option<i64> = filter.read.map(|r| if r { 1 } else { 0 });
        let rows = stmt.query_map(
            params![
                user_id,
                filter.category,
                read_flag,
                anchor_created,
                anchor_id,
                limit
            ],
            Self::map_notification_row,
        )?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        let next_cursor = if items.len() == limit as usize {
            items.last().map(|n| n.id.clone())
        } else {
            None
        };
        Ok(NotificationPage { items, next_cursor })
    }

    /// Find an unread task notification for the given task, if any. Backs the
    /// evaluator's lookup-before-insert dedup; not a uniqueness guarantee.
    pub fn find_unread_task_notification(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<DbNotification>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1
               AND task_id = ?2
               AND category IN ('task_due', 'task_overdue')
               AND read_at IS NULL
             LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(params![user_id, task_id], Self::map_notification_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Mark one notification read. Returns false when no owned row matched.
    /// Already-read rows keep their original `read_at`.
    pub fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE notifications SET read_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND read_at IS NULL",
            params![now, id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark all of a user's unread notifications read. Returns the count.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE notifications SET read_at = ?1
             WHERE user_id = ?2 AND read_at IS NULL",
            params![now, user_id],
        )?;
        Ok(changed)
    }

    /// Count a user's unread notifications.
    pub fn count_unread_notifications(&self, user_id: &str) -> Result<usize, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read_at IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub(crate) fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbNotification> {
        Ok(DbNotification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            task_id: row.get(5)?,
            metadata: row.get(6)?,
            read_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{seed_user, test_db};
    use super::*;

    fn sample_notification(id: &str, user_id: &str, created_at: &str) -> DbNotification {
        DbNotification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            category: "task_overdue".to_string(),
            title: format!("Notification {id}"),
            body: None,
            task_id: Some(format!("task-{id}")),
            metadata: Some(format!(r#"{{"taskId":"task-{id}","url":"/tasks/task-{id}"}}"#)),
            read_at: None,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_insert_and_find_unread_task_notification() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let n = sample_notification("n1", &user, "2026-01-01T10:00:00Z");
        db.insert_notification(&n).expect("insert");

        let found = db
            .find_unread_task_notification(&user, "task-n1")
            .expect("query");
        assert!(found.is_some());

        // Marking it read removes it from the dedup lookup
        assert!(db.mark_notification_read(&user, "n1").expect("mark read"));
        let found = db
            .find_unread_task_notification(&user, "task-n1")
            .expect("query");
        assert!(found.is_none());
    }

    #[test]
    fn test_mark_read_is_idempotent_and_owner_scoped() {
        let db = test_db();
        let user = seed_user(&db, "u1", "a@porchlight.test");
        seed_user(&db, "u2", "b@porchlight.test");

        db.insert_notification(&sample_notification("n1", &user, "2026-01-01T10:00:00Z"))
            .expect("insert");

        // Another user can't mark it
        assert!(!db.mark_notification_read("u2", "n1").expect("foreign mark"));

        assert!(db.mark_notification_read(&user, "n1").expect("first mark"));
        // Second mark is a no-op that preserves the original read_at
        assert!(!db.mark_notification_read(&user, "n1").expect("second mark"));
    }

    #[test]
    fn test_mark_all_read_counts() {
        let db = test_db();
        let user = seed_user(&db, "u1", "a@porchlight.test");

        for i in 0..3 {
            db.insert_notification(&sample_notification(
                &format!("n{i}"),
                &user,
                "2026-01-01T10:00:00Z",
            ))
            .expect("insert");
        }
        db.mark_notification_read(&user, "n0").expect("pre-read");

        let marked = db.mark_all_notifications_read(&user).expect("mark all");
        assert_eq!(marked, 2);
        assert_eq!(db.count_unread_notifications(&user).expect("count"), 0);
    }

    #[test]
    fn test_pagination_walks_without_overlap() {
        let db = test_db();
        let user = seed_user(&db, "u1", "a@porchlight.test");

        // Distinct timestamps so ordering is unambiguous
        for i in 0..5 {
            db.insert_notification(&sample_notification(
                &format!("n{i}"),
                &user,
                &format!("2026-01-0{}T10:00:00Z", i + 1),
            ))
            .expect("insert");
        }

        let filter = NotificationFilter {
            limit: 2,
            ..Default::default()
        };
        let page1 = db.get_notifications(&user, &filter).expect("page 1");
        assert_eq!(page1.items.len(), 2);
        assert_eq!(page1.items[0].id, "n4", "newest first");

        let page2 = db
            .get_notifications(
                &user,
                &NotificationFilter {
                    limit: 2,
                    cursor: page1.next_cursor.clone(),
                    ..Default::default()
                },
            )
            .expect("page 2");
        let page3 = db
            .get_notifications(
                &user,
                &NotificationFilter {
                    limit: 2,
                    cursor: page2.next_cursor.clone(),
                    ..Default::default()
                },
            )
            .expect("page 3");

        let mut seen: Vec<String> = Vec::new();
        for page in [&page1, &page2, &page3] {
            for item in &page.items {
                assert!(!seen.contains(&item.id), "no overlap across pages");
                seen.push(item.id.clone());
            }
        }
        assert_eq!(seen.len(), 5, "no gaps across pages");
        assert!(page3.next_cursor.is_none() || page3.items.is_empty());
    }

    #[test]
    fn test_category_and_read_filters() {
        let db = test_db();
        let user = seed_user(&db, "u1", "a@porchlight.test");

        let mut assigned = sample_notification("n1", &user, "2026-01-01T10:00:00Z");
        assigned.category = "task_assigned".to_string();
        db.insert_notification(&assigned).expect("insert");
        db.insert_notification(&sample_notification("n2", &user, "2026-01-02T10:00:00Z"))
            .expect("insert");
        db.mark_notification_read(&user, "n2").expect("mark");

        let overdue = db
            .get_notifications(
                &user,
                &NotificationFilter {
                    category: Some("task_overdue".to_string()),
                    limit: 10,
                    ..Default::default()
                },
            )
            .expect("query");
        assert_eq!(overdue.items.len(), 1);
        assert_eq!(overdue.items[0].id, "n2");

        let unread = db
            .get_notifications(
                &user,
                &NotificationFilter {
                    read: Some(false),
                    limit: 10,
                    ..Default::default()
                },
            )
            .expect("query");
        assert_eq!(unread.items.len(), 1);
        assert_eq!(unread.items[0].id, "n1");
    }
}
