use serde::{Deserialize, Serialize};

// Form payloads. Every field defaults to empty so a missing field is treated
// the same as a blank one and reported through a flash message.

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameExists {
    pub exists: bool,
}

// -- Tickets --

#[derive(Debug, Default, Deserialize)]
pub struct TicketForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Query string of the confirmation page shown after a ticket is filed.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SubmittedQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default)]
    pub message: String,
}
