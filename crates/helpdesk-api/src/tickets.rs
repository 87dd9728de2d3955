use std::collections::HashMap;

use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};
use url::form_urlencoded;

use helpdesk_db::models::CategoryRow;
use helpdesk_types::TicketStatus;
use helpdesk_types::api::{StatusForm, SubmittedQuery, TicketForm};

use crate::authz::Action;
use crate::errors::PageError;
use crate::session::{Flash, RequestContext};
use crate::{AppState, run_blocking, views};

fn category_names(categories: Vec<CategoryRow>) -> HashMap<i64, String> {
    categories
        .into_iter()
        .map(|c| (c.category_id, c.category_name))
        .collect()
}

pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::ViewDashboard) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };

    let db = state.db.clone();
    let (admin, user_id) = (identity.is_admin(), identity.user_id);
    let (tickets, categories) = run_blocking(move || {
        let tickets = if admin {
            db.list_all_tickets()?
        } else {
            db.list_tickets_for_user(user_id)?
        };
        Ok((tickets, db.list_categories()?))
    })
    .await?;

    let flashes = ctx.take_flashes(&state);
    Ok(views::dashboard_page(&identity, &flashes, &tickets, &category_names(categories)).into_response())
}

pub async fn create_ticket_form(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::CreateTicket) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };

    let db = state.db.clone();
    let categories = run_blocking(move || db.list_categories()).await?;

    let flashes = ctx.take_flashes(&state);
    Ok(views::create_ticket_page(&identity, &flashes, &categories, &TicketForm::default()).into_response())
}

pub async fn create_ticket(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<TicketForm>, FormRejection>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::CreateTicket) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("Unreadable ticket submission from user {}: {}", identity.user_id, rejection);
            return Ok(rejection.into_response());
        }
    };

    let db = state.db.clone();
    let categories = run_blocking(move || db.list_categories()).await?;
    let rerender = |message: &str| {
        let mut flashes = ctx.take_flashes(&state);
        flashes.push(Flash::error(message));
        views::create_ticket_page(&identity, &flashes, &categories, &form).into_response()
    };

    let title = form.title.trim();
    let description = form.description.trim();
    let category = form.category.trim();

    if title.is_empty() || description.is_empty() || category.is_empty() {
        warn!("Ticket submission failed: missing fields (user {})", identity.user_id);
        return Ok(rerender("All fields are required to submit a ticket."));
    }

    let category_id = match category.parse::<i64>() {
        Ok(id) if categories.iter().any(|c| c.category_id == id) => id,
        _ => {
            warn!("Ticket submission with unknown category '{}' (user {})", category, identity.user_id);
            return Ok(rerender("Please choose a valid category."));
        }
    };

    let db = state.db.clone();
    let (user_id, t, d) = (identity.user_id, title.to_string(), description.to_string());
    match run_blocking(move || db.create_ticket(user_id, category_id, &t, &d)).await {
        Ok(ticket_id) => {
            info!("Ticket {} created by user {}: '{}'", ticket_id, user_id, title);
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("title", title)
                .append_pair("description", description)
                .append_pair("category", category)
                .finish();
            Ok(Redirect::to(&format!("/ticket_submitted?{query}")).into_response())
        }
        Err(e) => {
            error!("Ticket creation failed for user {}: {}", user_id, e);
            Ok(rerender("Something went wrong while creating your ticket."))
        }
    }
}

pub async fn ticket_submitted(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<SubmittedQuery>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::ViewSubmission) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };

    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
    let (Some(title), Some(description), Some(category_id)) = (
        present(&query.title),
        present(&query.description),
        present(&query.category).and_then(|c| c.parse::<i64>().ok()),
    ) else {
        return Ok(Redirect::to("/create_ticket").into_response());
    };

    let db = state.db.clone();
    let categories = category_names(run_blocking(move || db.list_categories()).await?);
    let category = categories
        .get(&category_id)
        .map(String::as_str)
        .unwrap_or("Unknown");

    let flashes = ctx.take_flashes(&state);
    Ok(views::ticket_submitted_page(&identity, &flashes, &title, &description, category).into_response())
}

pub async fn ticket_details(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(ticket_id): Path<i64>,
) -> Result<Response, PageError> {
    let db = state.db.clone();
    let found = run_blocking(move || {
        let Some(ticket) = db.get_ticket(ticket_id)? else {
            return Ok(None);
        };
        let comments = db.list_comments_for_ticket(ticket_id)?;
        let categories = db.list_categories()?;
        Ok(Some((ticket, comments, categories)))
    })
    .await?;

    let Some((ticket, comments, categories)) = found else {
        warn!("Ticket {} not found", ticket_id);
        return Err(PageError::NotFound("Ticket not found.".into()));
    };

    let categories = category_names(categories);
    let category = categories
        .get(&ticket.category_id)
        .map(String::as_str)
        .unwrap_or("Unknown");

    let flashes = ctx.take_flashes(&state);
    Ok(views::ticket_page(ctx.identity.as_ref(), &flashes, &ticket, category, &comments).into_response())
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(ticket_id): Path<i64>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::DeleteTicket) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };

    let db = state.db.clone();
    if run_blocking(move || db.delete_ticket(ticket_id)).await? {
        info!("Ticket {} deleted by admin {}", ticket_id, identity.user_id);
    } else {
        warn!("Admin {} tried to delete missing ticket {}", identity.user_id, ticket_id);
    }
    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn update_ticket_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(ticket_id): Path<i64>,
    form: Result<Form<StatusForm>, FormRejection>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::UpdateStatus) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("Unreadable status update from admin {}: {}", identity.user_id, rejection);
            return Ok(rejection.into_response());
        }
    };

    let back = Redirect::to(&format!("/ticket/{ticket_id}"));
    let Some(status) = TicketStatus::parse_assignable(&form.status) else {
        warn!("Invalid ticket status '{}' for ticket {}", form.status, ticket_id);
        return Ok(back.into_response());
    };

    let db = state.db.clone();
    if run_blocking(move || db.update_ticket_status(ticket_id, status)).await? {
        info!("Ticket {} set to '{}' by admin {}", ticket_id, status, identity.user_id);
    }
    Ok(back.into_response())
}

/// Any signed-in user may close any ticket; there is no ownership check.
pub async fn confirm_close_ticket(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(ticket_id): Path<i64>,
) -> Result<Response, PageError> {
    let identity = match ctx.require(&state, Action::CloseTicket) {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };

    let db = state.db.clone();
    if run_blocking(move || db.close_ticket(ticket_id)).await? {
        info!("Ticket {} closed by user {}", ticket_id, identity.user_id);
    } else {
        warn!("User {} tried to close missing ticket {}", identity.user_id, ticket_id);
    }
    Ok(Redirect::to("/dashboard").into_response())
}
