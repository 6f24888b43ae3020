//! Users and bearer sessions.
//!
//! Tokens are random, shown to the caller exactly once, and stored only as a
//! SHA-256 hex digest. Validation hashes the presented token and looks up the
//! digest, so a database leak does not leak usable credentials.

use chrono::{Duration, Utc};
use rusqlite::params;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::*;

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl CrmDb {
    /// Insert a user. Fails on a duplicate email.
    pub fn create_user(&self, user: &DbUser) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, email, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.email, user.display_name, user.created_at],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, display_name, created_at FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, display_name, created_at FROM users WHERE email = ?1",
        )?;
        let mut rows = stmt.query_map(params![email], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Mint a session for a user and return the plaintext token. The token is
    /// not recoverable afterwards; only its hash is stored.
    pub fn create_session(&self, user_id: &str, ttl: Duration) -> Result<String, DbError> {
        let token = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                hash_token(&token),
                user_id,
                now.to_rfc3339(),
                (now + ttl).to_rfc3339(),
            ],
        )?;
        Ok(token)
    }

    /// Resolve a presented token to its user. Returns None for unknown or
    /// expired tokens.
    pub fn validate_session(&self, token: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.email, u.display_name, u.created_at
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
        )?;
        let now = Utc::now().to_rfc3339();
        let mut rows = stmt.query_map(params![hash_token(token), now], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Delete expired session rows. Returns the number removed.
    pub fn purge_expired_sessions(&self) -> Result<usize, DbError> {
        let removed = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(removed)
    }

    fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{seed_user, test_db};
    use super::*;

    #[test]
    fn test_valid_session_resolves_user() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let token = db
            .create_session(&user, Duration::days(30))
            .expect("create session");
        assert!(token.len() >= 64);

        let resolved = db.validate_session(&token).expect("validate");
        assert_eq!(resolved.expect("user").id, "u1");
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let db = test_db();
        seed_user(&db, "u1", "agent@porchlight.test");

        let resolved = db.validate_session("not-a-real-token").expect("validate");
        assert!(resolved.is_none());
    }

    #[test]
    fn test_expired_session_is_rejected_and_purged() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");

        let token = db
            .create_session(&user, Duration::seconds(-1))
            .expect("create session");
        assert!(db.validate_session(&token).expect("validate").is_none());

        let purged = db.purge_expired_sessions().expect("purge");
        assert_eq!(purged, 1);
    }

    #[test]
    fn test_get_user_by_email() {
        let db = test_db();
        seed_user(&db, "u1", "agent@porchlight.test");

        let user = db
            .get_user_by_email("agent@porchlight.test")
            .expect("query")
            .expect("exists");
        assert_eq!(user.id, "u1");
        assert!(db.get_user_by_email("nobody@porchlight.test").expect("query").is_none());
    }
}
