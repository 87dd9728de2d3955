//! Database row types. These map directly to SQLite rows.
//! Enumerated columns are decoded into their `helpdesk-types` enums on read.

use helpdesk_types::{Role, TicketStatus};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub category_id: i64,
    pub category_name: String,
}

#[derive(Debug, Clone)]
pub struct TicketRow {
    pub ticket_id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub created_at: String,
}

/// A comment flattened together with its author's username.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub comment_id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: String,
    pub author_username: String,
}
