use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::http::AppError;
use crate::AppState;

/// Name of the HTTP-only cookie carrying the signed token.
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(parts, AUTH_COOKIE)
            .ok_or_else(|| AppError::unauthorized("authentication token is missing"))?;

        let service = AuthService::new(
            state.db.clone(),
            state.auth_token_key,
            state.auth_token_ttl_hours,
        );
        let session = service
            .authenticate_token(&token)
            .map_err(|_| AppError::internal("failed to authenticate"))?;

        let session =
            session.ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;
        Ok(AuthUser {
            user_id: session.user_id,
        })
    }
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    for header in parts.headers.get_all(header::COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Build the Set-Cookie value for a freshly issued token.
pub fn auth_cookie(token: &str, max_age_seconds: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        AUTH_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
