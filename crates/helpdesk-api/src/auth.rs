use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use helpdesk_types::Role;
use helpdesk_types::api::{LoginForm, SignupForm, UsernameExists, UsernameQuery};

use crate::errors::PageError;
use crate::session::{Flash, RequestContext};
use crate::{AppState, run_blocking, views};

const MIN_PASSWORD_LEN: usize = 6;

pub async fn home(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let flashes = ctx.take_flashes(&state);
    views::login_page(ctx.identity.as_ref(), &flashes).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let username = form.username.trim().to_string();
    let password = form.password.trim().to_string();

    if username.is_empty() || password.is_empty() {
        warn!("Login attempt with missing credentials");
        return Ok(ctx.flash_redirect(&state, Flash::error("Username and password are required."), "/"));
    }

    let db = state.db.clone();
    let name = username.clone();
    let identity = run_blocking(move || db.authenticate(&name, &password)).await?;

    match identity {
        Some(identity) => {
            info!("User '{}' logged in as {}", username, identity.role);
            let jar = state.sessions.login(ctx.jar, identity);
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        None => {
            warn!("Login failed for username '{}'", username);
            Ok(ctx.flash_redirect(&state, Flash::error("Incorrect username or password."), "/"))
        }
    }
}

pub async fn signup_form(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let flashes = ctx.take_flashes(&state);
    views::signup_page(&flashes, &SignupForm::default()).into_response()
}

pub async fn signup(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<SignupForm>,
) -> Result<Response, PageError> {
    let rerender = |message: &str| -> Result<Response, PageError> {
        let mut flashes = ctx.take_flashes(&state);
        flashes.push(Flash::error(message));
        Ok(views::signup_page(&flashes, &form).into_response())
    };

    let username = form.username.trim();
    let email = form.email.trim();
    let password = form.password.trim();
    let confirm = form.confirm_password.trim();

    if [username, email, password, confirm].iter().any(|f| f.is_empty()) {
        warn!("Signup attempt with missing fields");
        return rerender("All fields are required.");
    }
    if password != confirm {
        warn!("Password mismatch on signup for '{}'", username);
        return rerender("Passwords do not match.");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("Weak password on signup for '{}'", username);
        return rerender("Password must be at least 6 characters.");
    }
    let role: Role = match form.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::User,
        Some(raw) => match raw.parse() {
            Ok(role) => role,
            Err(e) => {
                warn!("Signup for '{}' rejected: {}", username, e);
                return rerender("Invalid role.");
            }
        },
    };

    let db = state.db.clone();
    let (u, e, p) = (username.to_string(), email.to_string(), password.to_string());
    let created = run_blocking(move || db.register_user(&u, &e, &p, role)).await?;

    if created {
        info!("User '{}' registered", username);
        Ok(ctx.flash_redirect(&state, Flash::success("Account created! Please log in."), "/"))
    } else {
        warn!("Signup failed for '{}': duplicate username or email", username);
        rerender("Username or email already exists.")
    }
}

pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<UsernameExists>, PageError> {
    let username = query.username.trim().to_string();
    if username.is_empty() {
        return Ok(Json(UsernameExists { exists: false }));
    }

    let db = state.db.clone();
    let exists = run_blocking(move || db.username_exists(&username)).await?;
    Ok(Json(UsernameExists { exists }))
}

pub async fn logout(State(state): State<AppState>, ctx: RequestContext) -> impl IntoResponse {
    if let Some(identity) = &ctx.identity {
        info!("User '{}' logged out", identity.username);
    }
    let jar = state.sessions.logout(ctx.jar);
    (jar, Redirect::to("/"))
}
