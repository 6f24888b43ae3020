use rusqlite::params;

use super::*;

impl CrmDb {
    /// Append a deal activity row. The log is append-only; rows are never
    /// updated or deleted.
    pub fn insert_deal_activity(&self, activity: &DbDealActivity) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO deal_activity (id, deal_id, user_id, title, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                activity.id,
                activity.deal_id,
                activity.user_id,
                activity.title,
                activity.detail,
                activity.created_at,
            ],
        )?;
        Ok(())
    }

    /// List a deal's activity, newest first.
    pub fn get_deal_activity(&self, deal_id: &str) -> Result<Vec<DbDealActivity>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deal_id, user_id, title, detail, created_at
             FROM deal_activity
             WHERE deal_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![deal_id], |row| {
            Ok(DbDealActivity {
                id: row.get(0)?,
                deal_id: row.get(1)?,
                user_id: row.get(2)?,
                title: row.get(3)?,
                detail: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
