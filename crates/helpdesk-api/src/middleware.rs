use std::any::Any;

use axum::{
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::views;

/// Rewrite error responses that are not already an HTML page (extractor
/// rejections, bare status codes) into the generic error page.
pub async fn render_error_pages(response: Response) -> Response {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if is_html {
        return response;
    }

    let message = error_message(status);
    if status.is_server_error() {
        error!("{} - {}", status.as_u16(), message);
    } else {
        warn!("{} - {}", status.as_u16(), message);
    }

    (status, views::error_page(message)).into_response()
}

fn error_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad request.",
        StatusCode::UNAUTHORIZED => "Unauthorized access.",
        StatusCode::FORBIDDEN => "Permission denied.",
        StatusCode::NOT_FOUND => "Page not found.",
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed.",
        StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable input.",
        StatusCode::TOO_MANY_REQUESTS => "Too many requests. Please slow down.",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal server error.",
        s if s.is_server_error() => "Something went wrong.",
        _ => "Bad request.",
    }
}

pub async fn not_found(uri: Uri) -> Response {
    info!("404 - Page not found: {}", uri);
    (StatusCode::NOT_FOUND, views::error_page("Page not found.")).into_response()
}

/// Panics inside a handler end up here instead of dropping the connection.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Unhandled panic in handler: {}", details);

    (StatusCode::INTERNAL_SERVER_ERROR, views::error_page("Something went wrong.")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn plain_rejections_become_html_pages() {
        let response = Response::builder()
            .status(StatusCode::UNPROCESSABLE_ENTITY)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("Failed to deserialize form"))
            .unwrap();

        let rewritten = render_error_pages(response).await;
        assert_eq!(rewritten.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(rewritten.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Unprocessable input."));
        assert!(!body.contains("deserialize"));
    }

    #[tokio::test]
    async fn success_responses_pass_through() {
        let response = (StatusCode::OK, "fine").into_response();
        let passed = render_error_pages(response).await;
        assert_eq!(passed.status(), StatusCode::OK);
    }
}
