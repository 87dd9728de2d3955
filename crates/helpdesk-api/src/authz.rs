//! Every permission decision in the application goes through [`authorize`].

use helpdesk_types::{Identity, Role};

/// Gated operations. Viewing the login/signup pages and ticket details is
/// open to everyone and has no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewDashboard,
    CreateTicket,
    ViewSubmission,
    AddComment,
    /// No ownership check: any signed-in user may close any ticket.
    CloseTicket,
    DeleteTicket,
    UpdateStatus,
}

impl Action {
    fn required_role(self) -> Role {
        match self {
            Self::DeleteTicket | Self::UpdateStatus => Role::Admin,
            _ => Role::User,
        }
    }

    /// Flash message shown when the action is refused.
    pub fn denial_message(self) -> &'static str {
        match self {
            Self::ViewDashboard => "Please log in to view the dashboard.",
            Self::CreateTicket => "You must be logged in to create a ticket.",
            Self::ViewSubmission => "You must be logged in to view this page.",
            Self::AddComment => "You must be logged in to comment.",
            Self::CloseTicket => "You must be logged in to close a ticket.",
            Self::DeleteTicket => "Only admins can delete tickets.",
            Self::UpdateStatus => "Unauthorized ticket status update attempt.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("not logged in")]
    Anonymous,
    #[error("admin role required")]
    NotAdmin,
}

pub fn authorize(identity: Option<&Identity>, action: Action) -> Result<&Identity, Denied> {
    let identity = identity.ok_or(Denied::Anonymous)?;
    match (action.required_role(), identity.role) {
        (Role::Admin, Role::User) => Err(Denied::NotAdmin),
        _ => Ok(identity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Action; 7] = [
        Action::ViewDashboard,
        Action::CreateTicket,
        Action::ViewSubmission,
        Action::AddComment,
        Action::CloseTicket,
        Action::DeleteTicket,
        Action::UpdateStatus,
    ];

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: 1,
            username: "someone".into(),
            role,
        }
    }

    #[test]
    fn anonymous_is_denied_everything() {
        for action in ALL {
            assert_eq!(authorize(None, action), Err(Denied::Anonymous), "{action:?}");
        }
    }

    #[test]
    fn users_are_denied_only_admin_actions() {
        let user = identity(Role::User);
        for action in ALL {
            let expected_denied = matches!(action, Action::DeleteTicket | Action::UpdateStatus);
            assert_eq!(authorize(Some(&user), action).is_err(), expected_denied, "{action:?}");
        }
    }

    #[test]
    fn admins_are_allowed_everything() {
        let admin = identity(Role::Admin);
        for action in ALL {
            assert_eq!(authorize(Some(&admin), action), Ok(&admin));
        }
    }
}
