//! Server-rendered HTML pages.
//!
//! Every interpolated value passes through [`escape`].

use std::collections::HashMap;
use std::fmt::Write;

use axum::response::Html;

use helpdesk_db::models::{CategoryRow, CommentRow, TicketRow};
use helpdesk_types::api::{SignupForm, TicketForm};
use helpdesk_types::{Identity, TicketStatus};

use crate::session::Flash;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, identity: Option<&Identity>, flashes: &[Flash], body: &str) -> Html<String> {
    let mut nav = String::new();
    match identity {
        Some(who) => {
            let _ = write!(
                nav,
                "<span>Signed in as <strong>{}</strong> ({})</span> \
                 <a href=\"/dashboard\">Dashboard</a> \
                 <a href=\"/create_ticket\">New ticket</a> \
                 <a href=\"/logout\">Log out</a>",
                escape(&who.username),
                who.role
            );
        }
        None => nav.push_str("<a href=\"/\">Log in</a> <a href=\"/signup\">Sign up</a>"),
    }

    let mut messages = String::new();
    for flash in flashes {
        let _ = write!(
            messages,
            "<div class=\"flash flash-{}\">{}</div>",
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} - Help Desk</title>\n</head>\n<body>\n\
         <header><nav>{nav}</nav></header>\n<main>\n{messages}\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

pub fn error_page(message: &str) -> Html<String> {
    let body = format!(
        "<h2>Error</h2>\n<p class=\"error-message\">{}</p>\n<p><a href=\"/\">Back to home</a></p>",
        escape(message)
    );
    layout("Error", None, &[], &body)
}

pub fn login_page(identity: Option<&Identity>, flashes: &[Flash]) -> Html<String> {
    let body = "<h2>Login</h2>\n\
        <form method=\"post\" action=\"/login\">\n\
        <label>Username <input name=\"username\" required></label>\n\
        <label>Password <input name=\"password\" type=\"password\" required></label>\n\
        <button type=\"submit\">Log in</button>\n\
        </form>\n\
        <p><a href=\"/signup\">Create New Account</a></p>";
    layout("Login", identity, flashes, body)
}

pub fn signup_page(flashes: &[Flash], draft: &SignupForm) -> Html<String> {
    let body = format!(
        "<h2>Create New Account</h2>\n\
         <form method=\"post\" action=\"/signup\">\n\
         <label>Username <input name=\"username\" id=\"username\" value=\"{username}\" required></label>\n\
         <span id=\"username-taken\" hidden>That username is already taken.</span>\n\
         <label>Email <input name=\"email\" type=\"email\" value=\"{email}\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" minlength=\"6\" required></label>\n\
         <label>Confirm password <input name=\"confirm_password\" type=\"password\" minlength=\"6\" required></label>\n\
         <label>Role <select name=\"role\"><option value=\"user\">User</option><option value=\"admin\">Admin</option></select></label>\n\
         <button type=\"submit\">Sign up</button>\n\
         </form>\n\
         <script>\n\
         document.getElementById('username').addEventListener('blur', async (e) => {{\n\
           const res = await fetch('/check_username?username=' + encodeURIComponent(e.target.value));\n\
           const data = await res.json();\n\
           document.getElementById('username-taken').hidden = !data.exists;\n\
         }});\n\
         </script>",
        username = escape(draft.username.trim()),
        email = escape(draft.email.trim()),
    );
    layout("Sign up", None, flashes, &body)
}

fn category_name(categories: &HashMap<i64, String>, id: i64) -> &str {
    categories.get(&id).map(String::as_str).unwrap_or("Unknown")
}

pub fn dashboard_page(
    identity: &Identity,
    flashes: &[Flash],
    tickets: &[TicketRow],
    categories: &HashMap<i64, String>,
) -> Html<String> {
    let admin = identity.is_admin();
    let heading = if admin { "All tickets" } else { "Your open tickets" };

    let mut rows = String::new();
    for t in tickets {
        let _ = write!(
            rows,
            "<tr><td>{id}</td><td><a href=\"/ticket/{id}\">{title}</a></td><td>{category}</td>\
             <td>{status}</td><td>{created}</td>",
            id = t.ticket_id,
            title = escape(&t.title),
            category = escape(category_name(categories, t.category_id)),
            status = t.status,
            created = escape(&t.created_at),
        );
        if admin {
            let _ = write!(
                rows,
                "<td><form method=\"post\" action=\"/delete_ticket/{}\">\
                 <button type=\"submit\">Delete</button></form></td>",
                t.ticket_id
            );
        }
        rows.push_str("</tr>\n");
    }

    let body = if tickets.is_empty() {
        format!("<h2>{heading}</h2>\n<p>No tickets to show.</p>")
    } else {
        format!(
            "<h2>{heading}</h2>\n<table>\n<tr><th>#</th><th>Title</th><th>Category</th>\
             <th>Status</th><th>Created</th>{extra}</tr>\n{rows}</table>",
            extra = if admin { "<th></th>" } else { "" },
        )
    };
    layout("Dashboard", Some(identity), flashes, &body)
}

pub fn create_ticket_page(
    identity: &Identity,
    flashes: &[Flash],
    categories: &[CategoryRow],
    draft: &TicketForm,
) -> Html<String> {
    let mut options = String::from("<option value=\"\">Choose a category</option>");
    for c in categories {
        let selected = if draft.category.trim() == c.category_id.to_string() {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            "<option value=\"{}\"{}>{}</option>",
            c.category_id,
            selected,
            escape(&c.category_name)
        );
    }

    let body = format!(
        "<h2>Create a ticket</h2>\n\
         <form method=\"post\" action=\"/create_ticket\">\n\
         <label>Title <input name=\"title\" value=\"{title}\" required></label>\n\
         <label>Description <textarea name=\"description\" required>{description}</textarea></label>\n\
         <label>Category <select name=\"category\" required>{options}</select></label>\n\
         <button type=\"submit\">Submit ticket</button>\n\
         </form>",
        title = escape(draft.title.trim()),
        description = escape(draft.description.trim()),
    );
    layout("Create ticket", Some(identity), flashes, &body)
}

pub fn ticket_submitted_page(
    identity: &Identity,
    flashes: &[Flash],
    title: &str,
    description: &str,
    category: &str,
) -> Html<String> {
    let body = format!(
        "<h2>Ticket submitted</h2>\n\
         <dl><dt>Title</dt><dd>{}</dd><dt>Description</dt><dd>{}</dd><dt>Category</dt><dd>{}</dd></dl>\n\
         <p><a href=\"/dashboard\">Back to dashboard</a></p>",
        escape(title),
        escape(description),
        escape(category)
    );
    layout("Ticket submitted", Some(identity), flashes, &body)
}

pub fn ticket_page(
    identity: Option<&Identity>,
    flashes: &[Flash],
    ticket: &TicketRow,
    category: &str,
    comments: &[CommentRow],
) -> Html<String> {
    let id = ticket.ticket_id;
    let mut body = format!(
        "<h2>Ticket #{id}: {title}</h2>\n\
         <dl><dt>Status</dt><dd class=\"status\">{status}</dd><dt>Category</dt><dd>{category}</dd>\
         <dt>Created</dt><dd>{created}</dd></dl>\n<p>{description}</p>\n",
        title = escape(&ticket.title),
        status = ticket.status,
        category = escape(category),
        created = escape(&ticket.created_at),
        description = escape(&ticket.description),
    );

    if let Some(who) = identity {
        if who.is_admin() {
            let mut options = String::new();
            for status in TicketStatus::ASSIGNABLE {
                let selected = if status == ticket.status { " selected" } else { "" };
                let _ = write!(options, "<option value=\"{status}\"{selected}>{status}</option>");
            }
            let _ = write!(
                body,
                "<form method=\"post\" action=\"/update_ticket_status/{id}\">\
                 <select name=\"status\">{options}</select><button type=\"submit\">Update status</button></form>\n\
                 <form method=\"post\" action=\"/delete_ticket/{id}\"><button type=\"submit\">Delete ticket</button></form>\n"
            );
        }
        if ticket.status != TicketStatus::Closed {
            let _ = write!(
                body,
                "<form method=\"post\" action=\"/confirm_close_ticket/{id}\">\
                 <button type=\"submit\">Close ticket</button></form>\n"
            );
        }
    }

    body.push_str("<h3>Comments</h3>\n");
    if comments.is_empty() {
        body.push_str("<p>No comments yet.</p>\n");
    }
    for c in comments {
        let _ = write!(
            body,
            "<div class=\"comment\"><p><strong>{}</strong> <small>{}</small></p><p>{}</p></div>\n",
            escape(&c.author_username),
            escape(&c.created_at),
            escape(&c.message)
        );
    }

    if identity.is_some() {
        let _ = write!(
            body,
            "<form method=\"post\" action=\"/add_comment\">\
             <input type=\"hidden\" name=\"ticket_id\" value=\"{id}\">\
             <label>Add a comment <textarea name=\"message\" required></textarea></label>\
             <button type=\"submit\">Post comment</button></form>"
        );
    }

    layout(&format!("Ticket #{id}"), identity, flashes, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>'"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;&#39;"
        );
    }

    #[test]
    fn flashes_are_rendered_escaped() {
        let page = login_page(None, &[Flash::error("<b>nope</b>")]);
        assert!(page.0.contains("flash-error"));
        assert!(page.0.contains("&lt;b&gt;nope&lt;/b&gt;"));
    }
}
