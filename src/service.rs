//! Reusable API clients bound to a base URL and default options.

use url::Url;

use crate::{
    backend::{DefaultBackend, Transport},
    client::Client,
    error::{Error, Result},
    options::RequestOptions,
    request::RequestHandle,
};

/// A base URL plus default options, shared by every call made through it.
///
/// Relative paths are resolved against the base URL with standard URL
/// reference resolution, so a base of `https://api.example.com/v1/` (note the
/// trailing slash) turns `users` into `https://api.example.com/v1/users`.
/// Call-site options are layered over the defaults with
/// [`RequestOptions::merge`]; the defaults themselves never change.
///
/// ```rust,no_run
/// use restwave::{Client, RequestOptions, RequestHandle, Service};
///
/// struct Twitter {
///     service: Service,
/// }
///
/// impl Client for Twitter {
///     fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
///         self.service.request(url, options)
///     }
/// }
///
/// impl Twitter {
///     fn timeline(&self, user: &str) -> RequestHandle {
///         self.get(&format!("statuses/user_timeline/{user}.json"), None)
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Service<T = DefaultBackend> {
    transport: T,
    base_url: Option<Url>,
    defaults: RequestOptions,
}

impl Default for Service {
    fn default() -> Self {
        Self::new(RequestOptions::new())
    }
}

impl Service {
    /// A service on the default transport.
    #[must_use]
    pub fn new(defaults: RequestOptions) -> Self {
        Self::with_transport(DefaultBackend::default(), defaults)
    }
}

impl<T: Transport + Clone> Service<T> {
    /// A service on a specific transport.
    pub const fn with_transport(transport: T, defaults: RequestOptions) -> Self {
        Self {
            transport,
            base_url: None,
            defaults,
        }
    }

    /// Resolve relative request URLs against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUri`] if `base` is not an absolute URL.
    pub fn base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|err| Error::InvalidUri(format!("{base}: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// The options applied under every call.
    #[must_use]
    pub const fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// The URL a call to `path` would target.
    ///
    /// Without a base URL, or when `path` cannot be joined, `path` is used as
    /// given and any problem with it is reported through the request's events.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        self.base_url
            .as_ref()
            .and_then(|base| base.join(path).ok())
            .map_or_else(|| path.to_owned(), String::from)
    }
}

impl<T: Transport + Clone> Client for Service<T> {
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        self.transport
            .request(&self.resolve(url), self.defaults.merge(&options))
    }
}
