use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{debug, info, warn};

use helpdesk_types::Identity;

use crate::AppState;
use crate::authz::{self, Action};

pub const SESSION_COOKIE: &str = "helpdesk_session";

/// Idle lifetime of a session when none is configured.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Error,
    Success,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct SessionData {
    identity: Option<Identity>,
    flashes: Vec<Flash>,
    last_seen: Instant,
}

impl SessionData {
    fn new(identity: Option<Identity>, flashes: Vec<Flash>) -> Self {
        Self {
            identity,
            flashes,
            last_seen: Instant::now(),
        }
    }
}

/// Server-side sessions keyed by an opaque random token held in the
/// `helpdesk_session` cookie. The only process-wide mutable state.
///
/// Entries idle for longer than the TTL are treated as absent and dropped
/// on lookup; [`run_session_sweep`] reclaims the ones nobody comes back for.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionData>> {
        // A panic mid-update leaves at worst a stale flash; keep serving.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, session: &SessionData, now: Instant) -> bool {
        now.duration_since(session.last_seen) >= self.ttl
    }

    /// The live session for `token` with its last-seen time refreshed.
    fn live<'a>(&self, sessions: &'a mut HashMap<String, SessionData>, token: &str) -> Option<&'a mut SessionData> {
        let now = Instant::now();
        if self.is_expired(sessions.get(token)?, now) {
            sessions.remove(token);
            debug!("Session expired on lookup");
            return None;
        }
        let session = sessions.get_mut(token)?;
        session.last_seen = now;
        Some(session)
    }

    pub fn identity(&self, token: &str) -> Option<Identity> {
        let mut sessions = self.lock();
        self.live(&mut sessions, token).and_then(|s| s.identity.clone())
    }

    /// Bind `identity` to a fresh token. The previous session, if any, is
    /// discarded but its pending flashes are carried over.
    pub fn login(&self, jar: CookieJar, identity: Identity) -> CookieJar {
        let mut sessions = self.lock();
        let flashes = jar
            .get(SESSION_COOKIE)
            .and_then(|c| sessions.remove(c.value()))
            .filter(|old| !self.is_expired(old, Instant::now()))
            .map(|old| old.flashes)
            .unwrap_or_default();

        let token = new_token();
        debug!("Session started for user {}", identity.user_id);
        sessions.insert(token.clone(), SessionData::new(Some(identity), flashes));
        jar.add(session_cookie(token))
    }

    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            self.lock().remove(cookie.value());
        }
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    /// Queue a flash message, opening an anonymous session if the visitor
    /// has none yet.
    pub fn flash(&self, jar: CookieJar, flash: Flash) -> CookieJar {
        let mut sessions = self.lock();
        if let Some(session) = jar
            .get(SESSION_COOKIE)
            .and_then(|c| self.live(&mut sessions, c.value()))
        {
            session.flashes.push(flash);
            return jar;
        }

        let token = new_token();
        sessions.insert(token.clone(), SessionData::new(None, vec![flash]));
        jar.add(session_cookie(token))
    }

    pub fn take_flashes(&self, jar: &CookieJar) -> Vec<Flash> {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Vec::new();
        };
        let mut sessions = self.lock();
        self.live(&mut sessions, cookie.value())
            .map(|s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background task that prunes idle sessions on an interval.
pub async fn run_session_sweep(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        let pruned = state.sessions.prune_expired();
        if pruned > 0 {
            info!("Session sweep: pruned {} expired sessions", pruned);
        }
    }
}

fn new_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Per-request view of the session, resolved once from the cookie.
pub struct RequestContext {
    pub jar: CookieJar,
    pub identity: Option<Identity>,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let identity = jar
            .get(SESSION_COOKIE)
            .and_then(|c| state.sessions.identity(c.value()));
        Ok(Self { jar, identity })
    }
}

impl RequestContext {
    /// The identity allowed to perform `action`, or the redirect home (with
    /// the action's flash message) to return instead.
    pub fn require(&self, state: &AppState, action: Action) -> Result<Identity, Response> {
        match authz::authorize(self.identity.as_ref(), action) {
            Ok(identity) => Ok(identity.clone()),
            Err(denied) => {
                warn!(?action, "Request rejected: {}", denied);
                let jar = state
                    .sessions
                    .flash(self.jar.clone(), Flash::error(action.denial_message()));
                Err((jar, Redirect::to("/")).into_response())
            }
        }
    }

    pub fn take_flashes(&self, state: &AppState) -> Vec<Flash> {
        state.sessions.take_flashes(&self.jar)
    }

    /// Queue a flash and redirect to `to`.
    pub fn flash_redirect(self, state: &AppState, flash: Flash, to: &str) -> Response {
        let jar = state.sessions.flash(self.jar, flash);
        (jar, Redirect::to(to)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_types::Role;

    fn alice() -> Identity {
        Identity {
            user_id: 7,
            username: "alice".into(),
            role: Role::User,
        }
    }

    fn token(jar: &CookieJar) -> String {
        jar.get(SESSION_COOKIE).unwrap().value().to_string()
    }

    #[test]
    fn login_rotates_token_and_keeps_flashes() {
        let store = SessionStore::new();
        let jar = store.flash(CookieJar::new(), Flash::success("Account created! Please log in."));
        let anonymous = token(&jar);
        assert!(store.identity(&anonymous).is_none());

        let jar = store.login(jar, alice());
        let authenticated = token(&jar);

        assert_ne!(anonymous, authenticated);
        assert!(store.identity(&anonymous).is_none());
        assert_eq!(store.identity(&authenticated), Some(alice()));
        assert_eq!(
            store.take_flashes(&jar),
            vec![Flash::success("Account created! Please log in.")]
        );
        assert!(store.take_flashes(&jar).is_empty());
    }

    #[test]
    fn logout_forgets_the_session() {
        let store = SessionStore::new();
        let jar = store.login(CookieJar::new(), alice());
        let t = token(&jar);

        let jar = store.logout(jar);
        assert!(jar.get(SESSION_COOKIE).is_none());
        assert!(store.identity(&t).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_token_gets_a_fresh_session_for_flashes() {
        let store = SessionStore::new();
        let stale = CookieJar::new().add(session_cookie("stale".into()));

        let jar = store.flash(stale, Flash::error("nope"));
        assert_ne!(token(&jar), "stale");
        assert_eq!(store.take_flashes(&jar), vec![Flash::error("nope")]);
    }

    #[test]
    fn expired_session_resolves_anonymous_and_is_dropped() {
        let store = SessionStore::with_ttl(Duration::ZERO);
        let jar = store.login(CookieJar::new(), alice());
        let t = token(&jar);
        assert_eq!(store.len(), 1);

        assert!(store.identity(&t).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_reclaims_abandoned_anonymous_sessions() {
        let store = SessionStore::with_ttl(Duration::ZERO);
        for _ in 0..100 {
            let _ = store.flash(CookieJar::new(), Flash::error("Please log in first."));
        }
        assert_eq!(store.len(), 100);

        assert_eq!(store.prune_expired(), 100);
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_keeps_live_sessions() {
        let store = SessionStore::new();
        let jar = store.login(CookieJar::new(), alice());

        assert_eq!(store.prune_expired(), 0);
        assert_eq!(store.identity(&token(&jar)), Some(alice()));
    }
}
