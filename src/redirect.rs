//! Redirect resolution.

use http::{HeaderMap, StatusCode, header::LOCATION};
use url::Url;

use crate::error::{Error, Result};

/// Statuses that are followed when `follow_redirects` is on.
pub const FOLLOWED_STATUSES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
];

/// Whether a response with `status` starts a redirect hop.
#[must_use]
pub fn is_followed(status: StatusCode) -> bool {
    FOLLOWED_STATUSES.contains(&status)
}

/// Where the next hop goes and how it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// Target of the next request.
    pub url: Url,
    /// `303 See Other` turns the next request into a body-less GET.
    pub see_other: bool,
}

/// Resolve the `Location` of a redirect response against the current URL.
///
/// # Errors
///
/// Returns [`Error::Redirect`] when the header is missing, not valid text, or
/// does not resolve to an `http`/`https` URL.
pub fn next_hop(current: &Url, status: StatusCode, headers: &HeaderMap) -> Result<Hop> {
    let location = headers
        .get(LOCATION)
        .ok_or_else(|| Error::Redirect("missing Location header".into()))?
        .to_str()
        .map_err(|err| Error::Redirect(format!("invalid Location header: {err}")))?;

    let url = Url::parse(location)
        .or_else(|_| current.join(location))
        .map_err(|err| Error::Redirect(format!("invalid redirect location {location:?}: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Redirect(format!(
            "unsupported redirect scheme {:?}",
            url.scheme()
        )));
    }

    Ok(Hop {
        url,
        see_other: status == StatusCode::SEE_OTHER,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn location(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn relative_locations_resolve_against_current_url() {
        let current = Url::parse("https://example.com/start/path?x=1").unwrap();
        let hop = next_hop(&current, StatusCode::FOUND, &location("/landing")).unwrap();
        assert_eq!(hop.url.as_str(), "https://example.com/landing");
        assert!(!hop.see_other);

        let hop = next_hop(&current, StatusCode::FOUND, &location("sibling")).unwrap();
        assert_eq!(hop.url.as_str(), "https://example.com/start/sibling");
    }

    #[test]
    fn absolute_locations_replace_the_host() {
        let current = Url::parse("https://example.com/").unwrap();
        let hop = next_hop(
            &current,
            StatusCode::SEE_OTHER,
            &location("http://example.net/next"),
        )
        .unwrap();
        assert_eq!(hop.url.as_str(), "http://example.net/next");
        assert!(hop.see_other);
    }

    #[test]
    fn missing_or_unusable_locations_fail() {
        let current = Url::parse("https://example.com/").unwrap();
        let err = next_hop(&current, StatusCode::FOUND, &HeaderMap::new()).unwrap_err();
        assert!(err.is_redirect_error());
        assert!(next_hop(&current, StatusCode::FOUND, &location("ftp://example.com/f")).is_err());
    }

    #[test]
    fn only_the_classic_redirects_are_followed() {
        assert!(is_followed(StatusCode::MOVED_PERMANENTLY));
        assert!(is_followed(StatusCode::TEMPORARY_REDIRECT));
        assert!(!is_followed(StatusCode::NOT_MODIFIED));
        assert!(!is_followed(StatusCode::OK));
    }
}
