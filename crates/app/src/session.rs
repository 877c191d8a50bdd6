//! Browser session identity carried in the `quiz_session` cookie.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use tracing::{debug, warn};

use quiz_core::model::SessionId;

pub const SESSION_COOKIE: &str = "quiz_session";

/// Session id for one request; `issued` when the client did not send one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub id: SessionId,
    pub issued: bool,
}

impl SessionCookie {
    /// Read the session cookie, issuing a new id when it is absent or invalid.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| match value.parse::<SessionId>() {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(error = %err, "ignoring malformed session cookie");
                    None
                }
            });

        match existing {
            Some(id) => Self { id, issued: false },
            None => {
                let id = SessionId::generate();
                debug!(session_id = %id, "issuing new session");
                Self { id, issued: true }
            }
        }
    }

    /// Attach `Set-Cookie` to `response` when the id was issued on this request.
    #[must_use]
    pub fn apply(&self, mut response: Response) -> Response {
        if self.issued {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => warn!(error = %err, "could not encode session cookie"),
            }
        }
        response
    }
}
