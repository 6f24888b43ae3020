use rusqlite::params;

use super::*;

impl CrmDb {
    /// Insert a milestone row.
    pub fn insert_milestone(&self, milestone: &DbMilestone) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO milestones (
                id, deal_id, title, status, scheduled_date, completed_at, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                milestone.id,
                milestone.deal_id,
                milestone.title,
                milestone.status,
                milestone.scheduled_date,
                milestone.completed_at,
                milestone.created_at,
            ],
        )?;
        Ok(())
    }

    /// List a deal's milestones, earliest scheduled first, unscheduled last.
    pub fn get_milestones(&self, deal_id: &str) -> Result<Vec<DbMilestone>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deal_id, title, status, scheduled_date, completed_at, created_at
             FROM milestones
             WHERE deal_id = ?1
             ORDER BY
               CASE WHEN scheduled_date IS NULL THEN 1 ELSE 0 END,
               scheduled_date,
               created_at",
        )?;
        let rows = stmt.query_map(params![deal_id], |row| {
            Ok(DbMilestone {
                id: row.get(0)?,
                deal_id: row.get(1)?,
                title: row.get(2)?,
                status: row.get(3)?,
                scheduled_date: row.get(4)?,
                completed_at: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Mark a milestone complete with the current timestamp.
    pub fn complete_milestone(&self, id: &str) -> Result<bool, DbError> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE milestones SET status = 'complete', completed_at = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![now, id],
        )?;
        Ok(changed > 0)
    }
}
