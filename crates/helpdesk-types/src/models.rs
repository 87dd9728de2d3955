use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

/// Authorization tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ParseError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a ticket as stored in the `tickets.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "resolved")]
    Resolved,
}

impl TicketStatus {
    /// Statuses an administrator may pick from the ticket page.
    /// `Resolved` exists in stored data but is never assigned through the UI.
    pub const ASSIGNABLE: [TicketStatus; 3] = [Self::Open, Self::InProgress, Self::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Closed => "closed",
            Self::Resolved => "resolved",
        }
    }

    /// Parse a status submitted by an administrator. Only the assignable
    /// statuses are accepted.
    pub fn parse_assignable(s: &str) -> Option<Self> {
        Self::ASSIGNABLE.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            "resolved" => Ok(Self::Resolved),
            other => Err(ParseError {
                kind: "ticket status",
                value: other.to_string(),
            }),
        }
    }
}

/// The authenticated account behind a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_is_not_assignable() {
        assert_eq!(TicketStatus::parse_assignable("in progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse_assignable("resolved"), None);
        assert_eq!(TicketStatus::parse_assignable("Closed"), None);
        assert_eq!("resolved".parse::<TicketStatus>().unwrap(), TicketStatus::Resolved);
    }

    #[test]
    fn role_rejects_unknown_values() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'root'");
    }
}
