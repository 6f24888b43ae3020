use chrono::Utc;
use rusqlite::params;

use super::*;

const DEAL_COLUMNS: &str = "id, user_id, client_id, title, property_address, current_stage,
        status, deal_value, commission_amount, expected_close_date, lost_reason,
        closed_at, is_deleted, created_at, updated_at";

impl CrmDb {
    /// Insert or update a deal. Uses SQLite `ON CONFLICT` (upsert).
    pub fn upsert_deal(&self, deal: &DbDeal) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO deals (
                id, user_id, client_id, title, property_address, current_stage,
                status, deal_value, commission_amount, expected_close_date,
                lost_reason, closed_at, is_deleted, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                title = excluded.title,
                property_address = excluded.property_address,
                current_stage = excluded.current_stage,
                status = excluded.status,
                deal_value = excluded.deal_value,
                commission_amount = excluded.commission_amount,
                expected_close_date = excluded.expected_close_date,
                lost_reason = excluded.lost_reason,
                closed_at = excluded.closed_at,
                is_deleted = excluded.is_deleted,
                updated_at = excluded.updated_at",
            params![
                deal.id,
                deal.user_id,
                deal.client_id,
                deal.title,
                deal.property_address,
                deal.current_stage,
                deal.status,
                deal.deal_value,
                deal.commission_amount,
                deal.expected_close_date,
                deal.lost_reason,
                deal.closed_at,
                deal.is_deleted,
                deal.created_at,
                deal.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a deal by id, scoped to its owner. Soft-deleted rows are invisible,
    /// so absence and foreign ownership look the same to the caller.
    pub fn get_deal(&self, user_id: &str, id: &str) -> Result<Option<DbDeal>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals
             WHERE id = ?1 AND user_id = ?2 AND is_deleted = 0"
        ))?;
        let mut rows = stmt.query_map(params![id, user_id], Self::map_deal_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's deals, most recently updated first.
    pub fn get_deals(&self, user_id: &str) -> Result<Vec<DbDeal>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals
             WHERE user_id = ?1 AND is_deleted = 0
             ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], Self::map_deal_row)?;

        let mut deals = Vec::new();
        for row in rows {
            deals.push(row?);
        }
        Ok(deals)
    }

    /// Apply a stage transition to a deal row.
    ///
    /// Terminal transitions stamp `closed_at` and set the terminal status;
    /// non-terminal transitions keep the deal active with `closed_at` NULL.
    /// Caller is responsible for validation and for wrapping this in a
    /// transaction together with milestone and activity writes.
    pub fn update_deal_stage(
        &self,
        id: &str,
        stage: &str,
        status: &str,
        closed_at: Option<&str>,
        lost_reason: Option<&str>,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE deals
             SET current_stage = ?1,
                 status = ?2,
                 closed_at = ?3,
                 lost_reason = COALESCE(?4, lost_reason),
                 updated_at = ?5
             WHERE id = ?6",
            params![stage, status, closed_at, lost_reason, now, id],
        )?;
        Ok(())
    }

    /// Soft-delete a deal. Returns false when no owned row matched.
    pub fn soft_delete_deal(&self, user_id: &str, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE deals SET is_deleted = 1, updated_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND is_deleted = 0",
            params![now, id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub(crate) fn map_deal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbDeal> {
        Ok(DbDeal {
            id: row.get(0)?,
            user_id: row.get(1)?,
            client_id: row.get(2)?,
            title: row.get(3)?,
            property_address: row.get(4)?,
            current_stage: row.get(5)?,
            status: row.get(6)?,
            deal_value: row.get(7)?,
            commission_amount: row.get(8)?,
            expected_close_date: row.get(9)?,
            lost_reason: row.get(10)?,
            closed_at: row.get(11)?,
            is_deleted: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}
