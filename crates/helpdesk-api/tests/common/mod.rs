//! Shared fixture for router tests.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use helpdesk_api::{AppState, AppStateInner, router};
use helpdesk_db::Database;
use helpdesk_types::Role;
use tempfile::TempDir;
use tower::ServiceExt;
use url::form_urlencoded;

/// Router backed by a throwaway database.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|v| v.starts_with("helpdesk_session="))
            .filter_map(|v| v.split(';').next())
            .map(str::to_owned)
            .find(|pair| pair != "helpdesk_session=")
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location(), Some(to));
    }
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("helpdesk.db")).expect("Failed to open database");
        let state = AppStateInner::new(db);
        Self {
            router: router(state.clone()),
            state,
            _temp_dir: temp_dir,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)], cookie: Option<&str>) -> TestResponse {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// POST with no body and no content type.
    pub async fn post_empty(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Create an account directly in the store and return its id.
    pub fn register(&self, username: &str, password: &str, role: Role) -> i64 {
        let email = format!("{username}@example.com");
        assert!(self.db().register_user(username, &email, password, role).unwrap());
        self.db().get_user_by_username(username).unwrap().unwrap().user_id
    }

    /// Log in through the HTTP surface and return the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_form("/login", &[("username", username), ("password", password)], None)
            .await;
        res.assert_redirect("/dashboard");
        res.session_cookie().expect("login should set a session cookie")
    }

    /// Follow a flash-producing redirect to the home page and return its body.
    pub async fn home_page(&self, cookie: &str) -> String {
        self.get("/", Some(cookie)).await.body
    }
}
