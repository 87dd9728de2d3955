use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use rusqlite::Connection;
use tracing::{info, warn};

use helpdesk_types::{Identity, Role};

use crate::Database;
use crate::models::UserRow;
use crate::queries::OptionalExt;

impl Database {
    // -- Users --

    /// Hash the password and insert the account. Returns `Ok(false)` when the
    /// username or email is already taken; nothing is written in that case.
    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<bool> {
        let password_hash = hash_password(password)?;

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                (username, email, &password_hash, role.as_str()),
            );

            match inserted {
                Ok(_) => {
                    info!("Registered user '{}' with role {}", username, role);
                    Ok(true)
                }
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Verify credentials. Unknown usernames and wrong passwords both yield
    /// `None`, and both run one Argon2 verification.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>> {
        let user = self.with_conn(|conn| query_user_by_username(conn, username))?;

        let Some(user) = user else {
            if let Some(dummy) = dummy_hash() {
                let _ = verify_password(password, dummy);
            }
            return Ok(None);
        };

        if !verify_password(password, &user.password)? {
            return Ok(None);
        }

        Ok(Some(Identity {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
        }))
    }

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT user_id FROM users WHERE username = ?1", [username], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Returns `Ok(false)` on mismatch; `Err` only if the stored hash is unreadable.
fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow!("Stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            hash_password("not-a-real-password")
                .map_err(|e| warn!("Could not prepare dummy hash: {}", e))
                .ok()
        })
        .as_deref()
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, username, email, password, role FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            let role: String = row.get(4)?;
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: role.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_db;

    #[test]
    fn register_then_authenticate_returns_role() {
        let (_dir, db) = temp_db();

        assert!(db.register_user("alice", "alice@example.com", "secret1", Role::Admin).unwrap());

        let identity = db.authenticate("alice", "secret1").unwrap().unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn password_is_not_stored_in_plaintext() {
        let (_dir, db) = temp_db();
        db.register_user("bob", "bob@example.com", "hunter22", Role::User).unwrap();

        let row = db.get_user_by_username("bob").unwrap().unwrap();
        assert_ne!(row.password, "hunter22");
        assert!(row.password.starts_with("$argon2"));
    }

    #[test]
    fn wrong_password_and_unknown_user_both_fail() {
        let (_dir, db) = temp_db();
        db.register_user("carol", "carol@example.com", "rightpass", Role::User).unwrap();

        assert!(db.authenticate("carol", "wrongpass").unwrap().is_none());
        assert!(db.authenticate("nobody", "rightpass").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_is_rejected_without_a_row() {
        let (_dir, db) = temp_db();
        assert!(db.register_user("dave", "dave@example.com", "password", Role::User).unwrap());

        assert!(!db.register_user("dave", "other@example.com", "password", Role::User).unwrap());
        assert!(!db.register_user("dave2", "dave@example.com", "password", Role::User).unwrap());

        assert!(!db.username_exists("dave2").unwrap());
        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn username_exists_reflects_registration() {
        let (_dir, db) = temp_db();
        assert!(!db.username_exists("erin").unwrap());
        db.register_user("erin", "erin@example.com", "password", Role::User).unwrap();
        assert!(db.username_exists("erin").unwrap());
    }
}
