use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use helpdesk_types::Role;

use crate::Database;
use crate::credentials::hash_password;

/// Fixed ticket categories, in id order.
pub const CATEGORIES: [&str; 10] = [
    "Software Issue",
    "Hardware Issue",
    "Access Request",
    "Network Issue",
    "Security Issue",
    "UI Bug",
    "Performance Issue",
    "Database Error",
    "API Failure",
    "Other",
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'admin'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            category_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            category_name   TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS tickets (
            ticket_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(user_id),
            category_id INTEGER NOT NULL REFERENCES categories(category_id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'open',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_user
            ON tickets(user_id);

        CREATE TABLE IF NOT EXISTS comments (
            comment_id  INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_id   INTEGER NOT NULL REFERENCES tickets(ticket_id),
            user_id     INTEGER NOT NULL REFERENCES users(user_id),
            message     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_ticket
            ON comments(ticket_id, created_at);
        ",
    )?;

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO categories (category_name) VALUES (?1)")?;
    for name in CATEGORIES {
        stmt.execute([name])?;
    }

    info!("Database migrations complete");
    Ok(())
}

const DEMO_USERS: [(&str, &str, &str, Role); 10] = [
    ("admin1", "admin1@example.com", "adminpass1", Role::Admin),
    ("admin2", "admin2@example.com", "adminpass2", Role::Admin),
    ("user1", "user1@example.com", "userpass1", Role::User),
    ("user2", "user2@example.com", "userpass2", Role::User),
    ("user3", "user3@example.com", "userpass3", Role::User),
    ("user4", "user4@example.com", "userpass4", Role::User),
    ("user5", "user5@example.com", "userpass5", Role::User),
    ("user6", "user6@example.com", "userpass6", Role::User),
    ("user7", "user7@example.com", "userpass7", Role::User),
    ("user8", "user8@example.com", "userpass8", Role::User),
];

// (title, description, status, first comment); ticket N belongs to demo user N
// and category N.
const DEMO_TICKETS: [(&str, &str, &str, &str); 10] = [
    ("Can't install software", "Installation fails with error code", "open", "Have you tried rebooting?"),
    ("Computer won't boot", "Stuck on startup screen", "open", "Check your startup settings."),
    ("Need VPN access", "Can't connect remotely", "in progress", "VPN config updated, please retry."),
    ("Slow network", "Internet keeps dropping", "resolved", "Network issues seem resolved now."),
    ("Suspicious email", "Possible phishing attack", "open", "Marking as phishing, IT should investigate."),
    ("Button misalignment", "UI not displaying correctly", "in progress", "Working on a UI fix."),
    ("App crashing", "Memory leak suspected", "open", "Checking logs for memory leaks."),
    ("Database connection issue", "Server not responding", "closed", "Database restored, retry connection."),
    ("API timeout", "3rd party service unresponsive", "resolved", "API provider confirmed downtime."),
    ("General support request", "Need help with configuration", "open", "Assistance provided, closing ticket."),
];

impl Database {
    /// Insert demo accounts, tickets and comments. Does nothing and returns
    /// `false` if any user already exists.
    pub fn seed_demo_data(&self) -> Result<bool> {
        // Hash outside the write transaction; Argon2 is slow on purpose.
        let hashes = DEMO_USERS
            .iter()
            .map(|(_, _, password, _)| hash_password(password))
            .collect::<Result<Vec<_>>>()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            if existing > 0 {
                return Ok(false);
            }

            let mut user_ids = Vec::with_capacity(DEMO_USERS.len());
            for ((username, email, _, role), hash) in DEMO_USERS.iter().zip(&hashes) {
                tx.execute(
                    "INSERT INTO users (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                    (username, email, hash, role.as_str()),
                )?;
                user_ids.push(tx.last_insert_rowid());
            }

            let created_at = crate::now_timestamp();
            for (i, (title, description, status, comment)) in DEMO_TICKETS.iter().enumerate() {
                let category_id: i64 = tx.query_row(
                    "SELECT category_id FROM categories WHERE category_name = ?1",
                    [CATEGORIES[i]],
                    |r| r.get(0),
                )?;
                tx.execute(
                    "INSERT INTO tickets (user_id, category_id, title, description, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    (user_ids[i], category_id, title, description, status, &created_at),
                )?;
                let ticket_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO comments (ticket_id, user_id, message, created_at) VALUES (?1, ?2, ?3, ?4)",
                    (ticket_id, user_ids[i], comment, &created_at),
                )?;
            }

            tx.commit()?;
            info!("Seeded {} demo users and {} demo tickets", DEMO_USERS.len(), DEMO_TICKETS.len());
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::temp_db;

    #[test]
    fn reopening_does_not_duplicate_categories() {
        let (_dir, db) = temp_db();
        let reopened = crate::Database::open(db.path()).unwrap();

        let categories = reopened.list_categories().unwrap();
        assert_eq!(categories.len(), super::CATEGORIES.len());
        assert_eq!(categories[0].category_name, "Software Issue");
        assert_eq!(categories[9].category_name, "Other");
    }

    #[test]
    fn demo_seed_runs_once() {
        let (_dir, db) = temp_db();

        assert!(db.seed_demo_data().unwrap());
        assert!(!db.seed_demo_data().unwrap());

        let admin = db.authenticate("admin1", "adminpass1").unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(db.list_all_tickets().unwrap().len(), 10);
    }
}
