use axum::http::{
    header::{InvalidHeaderValue, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use time::Duration;

use crate::config::CookieConfig;

/// Cookie lifetime. Shorter than the token it carries; the token outlives it.
pub const COOKIE_MAX_AGE: Duration = Duration::minutes(15);

/// Writes and clears the session cookie that transports the signed token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    pub fn new(cfg: &CookieConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            secure: cfg.secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a site-wide `HttpOnly; SameSite=Strict` cookie holding `token`.
    pub fn set(&self, headers: &mut HeaderMap, token: &str) -> Result<(), InvalidHeaderValue> {
        let value = self.render(token, COOKIE_MAX_AGE.whole_seconds())?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    /// Overwrite the cookie with an empty, already-expired one.
    pub fn clear(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        let value = self.render("", 0)?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    fn render(&self, value: &str, max_age: i64) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}",
            self.name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}
