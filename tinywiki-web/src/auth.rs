//! Cookie sessions for the wiki.
//!
//! A successful login stores an HS256 JWT in the `session` cookie. The
//! extractors below check that token and re-read the users file so that
//! deleted or deactivated accounts lose access immediately.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tinywiki_core::UserManager;
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "session";

/// JWT claims stored in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User name
    pub sub: String,
    /// Expiry (Unix timestamp)
    pub exp: u64,
}

/// Errors during authentication/authorization.
#[derive(Debug)]
pub enum AuthError {
    /// No valid session; carries the path to return to after login.
    LoginRequired { next: String },
    InvalidToken(String),
    Forbidden(&'static str),
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::LoginRequired { next } => write!(f, "login required for {}", next),
            AuthError::InvalidToken(msg) => write!(f, "invalid session: {}", msg),
            AuthError::Forbidden(what) => write!(f, "forbidden: {}", what),
            AuthError::Internal(msg) => write!(f, "auth backend failed: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::LoginRequired { next } => {
                Redirect::to(&format!("/user/login/?next={}", encode_next(&next))).into_response()
            }
            AuthError::InvalidToken(_) => {
                Redirect::to("/user/login/").into_response()
            }
            AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            AuthError::Internal(_) => {
                warn!(error = %self, "authentication failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

/// Signing keys and lifetime for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    /// Clock skew leeway in seconds (default: 60)
    leeway_secs: u64,
}

impl SessionKeys {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            leeway_secs: 60,
        }
    }

    /// Keys from a random per-process secret. Sessions end when the process exits.
    pub fn random(ttl: Duration) -> Self {
        let mut secret = Vec::with_capacity(32);
        secret.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        secret.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::new(secret, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session token for `name`.
    pub fn issue(&self, name: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: name.to_string(),
            exp: now + self.ttl.as_secs(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to encode token: {}", e)))
    }

    /// Decode and validate a session token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = self.leeway_secs;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Cookie carrying `token`.
    pub fn cookie(token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Cookie that clears the session.
    pub fn removal() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }
}

/// State extension that holds session keys and the users file.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionKeys>,
    pub users: Arc<UserManager>,
    /// Require login for reading too
    pub private: bool,
}

/// A logged-in, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub name: String,
    pub admin: bool,
}

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden("administrator role required"))
        }
    }
}

/// Wrapper for an optional session (routes that work with or without login)
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn name(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.name.as_str())
    }
}

/// Path to return to after logging in.
fn return_path(parts: &Parts) -> String {
    parts.uri.path().to_string()
}

/// Percent-encode the characters that would end a `next` query value early.
fn encode_next(next: &str) -> String {
    let mut out = String::with_capacity(next.len());
    for c in next.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '+' => out.push_str("%2B"),
            '#' => out.push_str("%23"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Resolve the session cookie to an active user, if any.
async fn session_user(parts: &Parts, auth: &AuthState) -> Result<Option<CurrentUser>, AuthError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let claims = match auth.sessions.verify(cookie.value()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("ignoring session cookie: {}", e);
            return Ok(None);
        }
    };

    let users = auth.users.clone();
    let name = claims.sub.clone();
    let user = tokio::task::spawn_blocking(move || users.get_user(&name))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    Ok(user.filter(|u| u.active).map(|u| CurrentUser {
        admin: u.is_admin(),
        name: u.name,
    }))
}

/// Extractor for a required login
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<AuthState>()
            .cloned()
            .ok_or_else(|| AuthError::Internal("auth state missing".into()))?;

        session_user(parts, &auth)
            .await?
            .ok_or_else(|| AuthError::LoginRequired {
                next: return_path(parts),
            })
    }
}

/// Extractor for an optional login; required when the wiki is private
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.extensions.get::<AuthState>().cloned() else {
            // No auth configured, allow through
            return Ok(MaybeUser(None));
        };

        let user = session_user(parts, &auth).await?;
        if user.is_none() && auth.private {
            return Err(AuthError::LoginRequired {
                next: return_path(parts),
            });
        }
        Ok(MaybeUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let keys = SessionKeys::new(b"test-secret", Duration::from_secs(3600));
        let token = keys.issue("ana").unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "ana");
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let ours = SessionKeys::new(b"ours", Duration::from_secs(3600));
        let theirs = SessionKeys::new(b"theirs", Duration::from_secs(3600));
        let token = theirs.issue("mallory").unwrap();

        assert!(matches!(ours.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_random_keys_differ() {
        let a = SessionKeys::random(Duration::from_secs(60));
        let b = SessionKeys::random(Duration::from_secs(60));
        let token = a.issue("ana").unwrap();
        assert!(a.verify(&token).is_ok());
        assert!(b.verify(&token).is_err());
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/edit/home/")), "/edit/home/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("/home/\r\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_encode_next() {
        assert_eq!(encode_next("/edit/a&b/"), "/edit/a%26b/");
        assert_eq!(encode_next("/my%20page/"), "/my%2520page/");
    }

    #[test]
    fn test_login_redirect() {
        let response = AuthError::LoginRequired {
            next: "/edit/home/".into(),
        }
        .into_response();
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers()["location"],
            "/user/login/?next=/edit/home/"
        );
    }
}
