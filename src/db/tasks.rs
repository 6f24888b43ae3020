use chrono::Utc;
use rusqlite::params;

use super::*;

const TASK_COLUMNS: &str = "id, user_id, client_id, title, description, due_date,
        priority, status, completed_at, created_at, updated_at";

impl CrmDb {
    /// Insert or update a task. Uses SQLite `ON CONFLICT` (upsert).
    pub fn upsert_task(&self, task: &DbTask) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO tasks (
                id, user_id, client_id, title, description, due_date,
                priority, status, completed_at, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                title = excluded.title,
                description = excluded.description,
                due_date = excluded.due_date,
                priority = excluded.priority,
                status = excluded.status,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at",
            params![
                task.id,
                task.user_id,
                task.client_id,
                task.title,
                task.description,
                task.due_date,
                task.priority,
                task.status,
                task.completed_at,
                task.created_at,
                task.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a single task by its id, scoped to the assignee.
    pub fn get_task(&self, user_id: &str, id: &str) -> Result<Option<DbTask>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![id, user_id], Self::map_task_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's tasks, optionally filtered by status.
    ///
    /// Ordered: overdue first, then by due date, undated last.
    pub fn get_tasks(&self, user_id: &str, status: Option<&str>) -> Result<Vec<DbTask>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1
               AND (?2 IS NULL OR status = ?2)
             ORDER BY
               CASE
                 WHEN due_date < date('now') AND status != 'closed' THEN 0
                 WHEN due_date IS NULL THEN 2
                 ELSE 1
               END,
               due_date,
               created_at DESC"
        ))?;
        let rows = stmt.query_map(params![user_id, status], Self::map_task_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Open (todo / in-progress) tasks assigned to a user with a due date on
    /// or before `date`. Feeds the lazy notification evaluator.
    pub fn get_due_open_tasks(&self, user_id: &str, date: &str) -> Result<Vec<DbTask>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1
               AND status IN ('todo', 'in_progress')
               AND due_date IS NOT NULL
               AND due_date <= ?2
             ORDER BY due_date ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, date], Self::map_task_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Set a task's status. `closed` stamps `completed_at`; leaving `closed`
    /// clears it.
    pub fn set_task_status(&self, user_id: &str, id: &str, status: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let completed_at = if status == "closed" { Some(now.clone()) } else { None };
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![status, completed_at, now, id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub(crate) fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbTask> {
        Ok(DbTask {
            id: row.get(0)?,
            user_id: row.get(1)?,
            client_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            due_date: row.get(5)?,
            priority: row.get(6)?,
            status: row.get(7)?,
            completed_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
