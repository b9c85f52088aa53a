//! `Authorization` header construction.

use base64::Engine;
use http::{HeaderValue, header::InvalidHeaderValue};
use url::Url;

use crate::options::RequestOptions;

/// Credentials resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Basic base64(username:password)`
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl Credentials {
    /// Pick credentials for a request.
    ///
    /// Userinfo embedded in the URL takes precedence over the options. Basic
    /// credentials are used only when a password is defined; otherwise the
    /// access token, if any, is sent as a bearer token.
    #[must_use]
    pub fn resolve(url: &Url, options: &RequestOptions) -> Option<Self> {
        let (username, password) = if url.username().is_empty() {
            (options.username.clone(), options.password.clone())
        } else {
            (
                Some(percent_decode(url.username())),
                url.password().map(percent_decode),
            )
        };

        match (username, password) {
            (Some(username), Some(password)) => Some(Self::Basic { username, password }),
            _ => options.access_token.clone().map(Self::Bearer),
        }
    }

    /// Render the header value.
    ///
    /// # Errors
    ///
    /// Returns an error if a bearer token contains characters not allowed in headers.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = match self {
            Self::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}").as_bytes());
                HeaderValue::from_str(&format!("Basic {encoded}"))?
            }
            Self::Bearer(token) => HeaderValue::from_str(&format!("Bearer {token}"))?,
        };
        value.set_sensitive(true);
        Ok(value)
    }
}

fn percent_decode(value: &str) -> String {
    percent_encoding::percent_decode_str(value)
        .decode_utf8_lossy()
        .into_owned()
}
