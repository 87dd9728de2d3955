use crate::models::{CategoryRow, CommentRow, TicketRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use helpdesk_types::TicketStatus;
use rusqlite::{Connection, Row};
use tracing::debug;

const TICKET_COLUMNS: &str =
    "ticket_id, user_id, category_id, title, description, status, created_at";

impl Database {
    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category_id, category_name FROM categories ORDER BY category_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        category_id: row.get(0)?,
                        category_name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn category_exists(&self, category_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT category_id FROM categories WHERE category_id = ?1",
                    [category_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Tickets --

    /// Insert a ticket with status `open`. Returns the new ticket id.
    pub fn create_ticket(
        &self,
        user_id: i64,
        category_id: i64,
        title: &str,
        description: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tickets (user_id, category_id, title, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    user_id,
                    category_id,
                    title,
                    description,
                    TicketStatus::Open.as_str(),
                    now_timestamp(),
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_ticket(&self, ticket_id: i64) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1");
            let row = conn.query_row(&sql, [ticket_id], map_ticket).optional()?;
            Ok(row)
        })
    }

    /// Tickets owned by `user_id`, excluding closed ones.
    pub fn list_tickets_for_user(&self, user_id: i64) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE user_id = ?1 AND status != ?2
                 ORDER BY ticket_id"
            );
            query_tickets(conn, &sql, (user_id, TicketStatus::Closed.as_str()))
        })
    }

    /// Every ticket, closed ones included.
    pub fn list_all_tickets(&self) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY ticket_id");
            query_tickets(conn, &sql, [])
        })
    }

    /// Returns `false` if no ticket has that id.
    pub fn update_ticket_status(&self, ticket_id: i64, status: TicketStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tickets SET status = ?1 WHERE ticket_id = ?2",
                (status.as_str(), ticket_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Force the ticket to `closed`, whatever its current status.
    pub fn close_ticket(&self, ticket_id: i64) -> Result<bool> {
        self.update_ticket_status(ticket_id, TicketStatus::Closed)
    }

    /// Delete a ticket and all of its comments in one transaction.
    /// Returns `false` if no ticket has that id.
    pub fn delete_ticket(&self, ticket_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let comments = tx.execute("DELETE FROM comments WHERE ticket_id = ?1", [ticket_id])?;
            let tickets = tx.execute("DELETE FROM tickets WHERE ticket_id = ?1", [ticket_id])?;
            tx.commit()?;

            debug!("Deleted ticket {} ({} comments)", ticket_id, comments);
            Ok(tickets > 0)
        })
    }

    // -- Comments --

    /// Returns the new comment id.
    pub fn add_comment(&self, ticket_id: i64, user_id: i64, message: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (ticket_id, user_id, message, created_at) VALUES (?1, ?2, ?3, ?4)",
                (ticket_id, user_id, message, now_timestamp()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Comments on a ticket, oldest first, each with its author's username.
    pub fn list_comments_for_ticket(&self, ticket_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.comment_id, c.ticket_id, c.user_id, c.message, c.created_at, u.username
                 FROM comments c
                 JOIN users u ON c.user_id = u.user_id
                 WHERE c.ticket_id = ?1
                 ORDER BY c.created_at ASC, c.comment_id ASC",
            )?;

            let rows = stmt
                .query_map([ticket_id], |row| {
                    Ok(CommentRow {
                        comment_id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        user_id: row.get(2)?,
                        message: row.get(3)?,
                        created_at: row.get(4)?,
                        author_username: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_tickets<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<TicketRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_ticket)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_ticket(row: &Row<'_>) -> rusqlite::Result<TicketRow> {
    let status: String = row.get(5)?;
    Ok(TicketRow {
        ticket_id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
