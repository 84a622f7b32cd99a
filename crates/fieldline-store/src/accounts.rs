use crate::{map_sqlite_err, Store, StoreError};
use fieldline_model::{CompanyId, DocumentId, Email, UserAccount};
use rusqlite::params;

fn decode_user(raw: &str) -> Result<UserAccount, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Backend(format!("decode user: {e}")))
}

impl Store {
    /// Upsert keyed on id. A clash on the global email unique index surfaces
    /// as [`StoreError::EmailExists`].
    pub async fn put_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let body = serde_json::to_string(user)
            .map_err(|e| StoreError::Backend(format!("encode user: {e}")))?;
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO users (id, company_id, email, token_hash, body) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id) DO UPDATE SET company_id = excluded.company_id, \
             email = excluded.email, token_hash = excluded.token_hash, \
             body = excluded.body",
            params![
                user.id.as_str(),
                user.company_id.as_str(),
                user.email.as_str(),
                user.session_token_hash,
                body
            ],
        )
        .map_err(|e| map_sqlite_err("users", e))?;
        Ok(())
    }

    pub async fn get_user(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<UserAccount, StoreError> {
        let conn = self.lock().await;
        let raw: String = conn
            .query_row(
                "SELECT body FROM users WHERE id = ?1 AND company_id = ?2",
                params![id.as_str(), company_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("user"),
                other => map_sqlite_err("users", other),
            })?;
        drop(conn);
        decode_user(&raw)
    }

    /// Login lookup; email is unique across tenants so no scope applies.
    pub async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.lock().await;
        let raw: Option<String> = match conn.query_row(
            "SELECT body FROM users WHERE email = ?1",
            params![email.as_str()],
            |row| row.get(0),
        ) {
            Ok(raw) => Some(raw),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(map_sqlite_err("users", e)),
        };
        drop(conn);
        raw.map(|raw| decode_user(&raw)).transpose()
    }

    /// Bearer-token resolution; the match is on the token digest, never the
    /// token itself.
    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.lock().await;
        let raw: Option<String> = match conn.query_row(
            "SELECT body FROM users WHERE token_hash = ?1",
            params![token_hash],
            |row| row.get(0),
        ) {
            Ok(raw) => Some(raw),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(map_sqlite_err("users", e)),
        };
        drop(conn);
        raw.map(|raw| decode_user(&raw)).transpose()
    }

    pub async fn list_team(&self, company_id: &CompanyId) -> Result<Vec<UserAccount>, StoreError> {
        let conn = self.lock().await;
        let mut stmt = conn
            .prepare("SELECT body FROM users WHERE company_id = ?1 ORDER BY id")
            .map_err(|e| map_sqlite_err("users", e))?;
        let raw_rows: Result<Vec<String>, rusqlite::Error> = stmt
            .query_map(params![company_id.as_str()], |row| row.get(0))
            .map_err(|e| map_sqlite_err("users", e))?
            .collect();
        let raw_rows = raw_rows.map_err(|e| map_sqlite_err("users", e))?;
        drop(stmt);
        drop(conn);
        raw_rows.iter().map(|raw| decode_user(raw)).collect()
    }
}
