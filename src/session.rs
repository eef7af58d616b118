// src/session.rs
//! Login sessions.
//!
//! A session is a row in the store plus a signed `sessionid` cookie that
//! names it. The cookie is an HS256 JWT whose `sid` claim is the row id, so
//! deleting the row (logout, account deletion) revokes the cookie even while
//! its signature is still valid.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::models::auth::{Claims, User};
use crate::store::Store;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";

/// Lifetime of a "remember me" login, in seconds (two weeks).
pub const REMEMBER_ME_SECONDS: i64 = 1_209_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExpiry {
    /// The cookie carries no Max-Age and is dropped when the browser closes.
    BrowserClose,
    /// The cookie outlives the browser for the given number of seconds.
    Persistent(i64),
}

impl SessionExpiry {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            SessionExpiry::Persistent(REMEMBER_ME_SECONDS)
        } else {
            SessionExpiry::BrowserClose
        }
    }

    pub fn cookie_max_age(&self) -> Option<i64> {
        match self {
            SessionExpiry::BrowserClose => None,
            SessionExpiry::Persistent(seconds) => Some(*seconds),
        }
    }

    /// How long the server honours the session row. Browser-close sessions
    /// still get an upper bound so abandoned rows can be purged.
    pub fn server_lifetime(&self) -> Duration {
        match self {
            SessionExpiry::BrowserClose => Duration::seconds(REMEMBER_ME_SECONDS),
            SessionExpiry::Persistent(seconds) => Duration::seconds(*seconds),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, SessionExpiry::Persistent(_))
    }
}

/// The authenticated user for the current request, placed in request
/// extensions by the session middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: Uuid,
}

/// Creates a session row for `user` and returns the cookie that names it.
pub async fn start_session(
    store: &dyn Store,
    config: &AppConfig,
    user: &User,
    expiry: SessionExpiry,
) -> AppResult<Cookie<'static>> {
    let now = Utc::now();
    let expires_at = now + expiry.server_lifetime();

    let session = store
        .create_session(user.id, expiry.is_persistent(), expires_at)
        .await?;
    store.record_login(user.id, now).await?;

    let claims = Claims {
        sub: user.id.to_string(),
        sid: session.id.to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode_token(config, &claims)?;

    Ok(session_cookie(config, token, expiry))
}

/// Resolves a cookie value to the logged-in user. Bad signatures, expired
/// tokens, revoked sessions and inactive users all resolve to `None`.
pub async fn resolve_session(
    store: &dyn Store,
    config: &AppConfig,
    token: &str,
) -> AppResult<Option<CurrentUser>> {
    let claims = match decode_token(config, token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring session cookie: {}", e);
            return Ok(None);
        }
    };

    let (user_id, session_id) = match (claims.sub.parse::<i32>(), Uuid::parse_str(&claims.sid)) {
        (Ok(user_id), Ok(session_id)) => (user_id, session_id),
        _ => return Ok(None),
    };

    let session = match store.session_by_id(session_id).await? {
        Some(session) if session.user_id == user_id && !session.is_expired(Utc::now()) => session,
        _ => return Ok(None),
    };

    match store.user_by_id(user_id).await? {
        Some(user) if user.is_active => Ok(Some(CurrentUser {
            user,
            session_id: session.id,
        })),
        _ => Ok(None),
    }
}

pub async fn end_session(store: &dyn Store, session_id: Uuid) -> AppResult<()> {
    store.delete_session(session_id).await?;
    Ok(())
}

pub fn session_cookie(config: &AppConfig, token: String, expiry: SessionExpiry) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies);

    if let Some(seconds) = expiry.cookie_max_age() {
        builder = builder.max_age(time::Duration::seconds(seconds));
    }

    builder.build()
}

/// Cookie to hand to `CookieJar::remove`; the path must match the one set.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

fn encode_token(config: &AppConfig, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
}

fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
