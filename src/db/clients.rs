use chrono::Utc;
use rusqlite::params;

use super::*;

impl CrmDb {
    /// Insert or update a client. Uses SQLite `ON CONFLICT` (upsert).
    pub fn upsert_client(&self, client: &DbClient) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO clients (
                id, user_id, name, email, phone, client_type, notes,
                is_deleted, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                client_type = excluded.client_type,
                notes = excluded.notes,
                is_deleted = excluded.is_deleted,
                updated_at = excluded.updated_at",
            params![
                client.id,
                client.user_id,
                client.name,
                client.email,
                client.phone,
                client.client_type,
                client.notes,
                client.is_deleted,
                client.created_at,
                client.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a client by id, scoped to its owner. Soft-deleted rows are invisible.
    pub fn get_client(&self, user_id: &str, id: &str) -> Result<Option<DbClient>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, email, phone, client_type, notes,
                    is_deleted, created_at, updated_at
             FROM clients
             WHERE id = ?1 AND user_id = ?2 AND is_deleted = 0",
        )?;
        let mut rows = stmt.query_map(params![id, user_id], Self::map_client_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's clients, most recently updated first.
    pub fn get_clients(&self, user_id: &str) -> Result<Vec<DbClient>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, email, phone, client_type, notes,
                    is_deleted, created_at, updated_at
             FROM clients
             WHERE user_id = ?1 AND is_deleted = 0
             ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_client_row)?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }

    /// Soft-delete a client. Returns false when no owned row matched.
    pub fn soft_delete_client(&self, user_id: &str, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE clients SET is_deleted = 1, updated_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND is_deleted = 0",
            params![now, id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub(crate) fn map_client_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbClient> {
        Ok(DbClient {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            client_type: row.get(5)?,
            notes: row.get(6)?,
            is_deleted: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
