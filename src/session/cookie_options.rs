use cookie::SameSite;

/// Browsers keep a cookie at most 400 days, whatever `Max-Age` asks for.
pub(crate) const DEFAULT_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

/// The per-cookie budget browsers guarantee for `name=value`.
pub(crate) const DEFAULT_MAX_SIZE: usize = 4096;

/// Configuration options for the cookies that carry checkout records.
///
/// Gateways return control through a top-level `GET` navigation, so the default
/// `SameSite::Lax` keeps the records visible on the callback request.
///
/// The cookie lifetime is independent of the session TTL. Records outlive their
/// freshness window in the browser and are ignored on read once stale, and the
/// last-search record has no freshness window at all.
///
/// # Example
///
/// ```rust
/// use travelplace_checkout::CookieOptions;
///
/// let cookie_options = CookieOptions::build()
///         .http_only(true)
///         .same_site(cookie::SameSite::Lax)
///         .secure(true)
///         .max_size(4096)
///         .path("/");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CookieOptions {
    pub http_only: bool,
    pub domain: Option<&'static str>,
    pub path: Option<&'static str>,
    pub same_site: SameSite,
    pub secure: bool,
    pub max_age: i64,
    pub max_size: usize,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            domain: None,
            path: Some("/"),
            same_site: SameSite::Lax,
            secure: true,
            max_age: DEFAULT_MAX_AGE_SECS,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CookieOptions {
    /// Creates a new `CookieOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Hides the records from page scripts. Defaults to `true`.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Defaults to [`SameSite::Lax`].
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Sends the records over HTTPS only. Defaults to `true`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Scopes the records to `domain`. Unset by default, which means the host only.
    pub fn domain(mut self, domain: &'static str) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Defaults to `/`, so every checkout page sees every record.
    pub fn path(mut self, path: &'static str) -> Self {
        self.path = Some(path);
        self
    }

    /// Browser-side lifetime of the cookies in seconds. Defaults to 400 days.
    ///
    /// Freshness of a record is decided by the session TTL, not by this value.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Largest encoded `name=value` accepted for one record. Defaults to 4096 bytes.
    ///
    /// A larger write fails instead of being silently dropped by the browser.
    pub fn max_size(mut self, bytes: usize) -> Self {
        self.max_size = bytes;
        self
    }
}
