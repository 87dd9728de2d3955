use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use helpdesk_types::api::CommentForm;

use crate::authz::Action;
use crate::errors::PageError;
use crate::session::RequestContext;
use crate::{AppState, run_blocking};

pub async fn add_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::AddComment) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("Unreadable comment submission from user {}: {}", identity.user_id, rejection);
            return Ok(rejection.into_response());
        }
    };

    let Ok(ticket_id) = form.ticket_id.trim().parse::<i64>() else {
        warn!("Comment submission without a valid ticket id (user {})", identity.user_id);
        return Ok(Redirect::to("/dashboard").into_response());
    };
    let back = Redirect::to(&format!("/ticket/{ticket_id}"));

    let message = form.message.trim().to_string();
    if message.is_empty() {
        warn!("Comment submission on ticket {} with empty message", ticket_id);
        return Ok(back.into_response());
    }

    let db = state.db.clone();
    let user_id = identity.user_id;
    let added = run_blocking(move || {
        if db.get_ticket(ticket_id)?.is_none() {
            return Ok(None);
        }
        db.add_comment(ticket_id, user_id, &message).map(Some)
    })
    .await?;

    match added {
        Some(comment_id) => info!("Comment {} added to ticket {} by user {}", comment_id, ticket_id, user_id),
        None => warn!("User {} commented on missing ticket {}", user_id, ticket_id),
    }
    Ok(back.into_response())
}
