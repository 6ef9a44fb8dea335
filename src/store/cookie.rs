use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use cookie::time::Duration;
use http::Extensions;
use tower_cookies::{Cookie, Cookies};

use crate::CookieOptions;
use crate::store::{Error, StorageArea, StorageProvider};

/// A storage area that keeps every record in its own client cookie.
///
/// Values are base64url encoded so arbitrary JSON survives the cookie grammar. Browsers
/// drop a cookie whose `name=value` exceeds about 4KB, so a write larger than
/// [`CookieOptions::max_size`] fails with [`Error::Encode`] instead.
///
/// Requires the [`CookieManagerLayer`](tower_cookies::CookieManagerLayer) to be applied
/// outside the checkout layer.
#[derive(Clone, Debug)]
pub struct CookieStorage {
    cookies: Cookies,
    options: CookieOptions,
}

impl CookieStorage {
    pub fn new(cookies: Cookies, options: CookieOptions) -> Self {
        Self { cookies, options }
    }

    fn build_cookie(&self, key: &str, value: String) -> Cookie<'static> {
        let cookie_builder = Cookie::build((key.to_string(), value))
            .secure(self.options.secure)
            .http_only(self.options.http_only)
            .same_site(self.options.same_site)
            .max_age(Duration::seconds(self.options.max_age));

        let cookie_builder = if let Some(domain) = self.options.domain {
            cookie_builder.domain(domain)
        } else {
            cookie_builder
        };

        let cookie_builder = if let Some(path) = self.options.path {
            cookie_builder.path(path)
        } else {
            cookie_builder
        };

        cookie_builder.build()
    }
}

impl StorageArea for CookieStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let Some(cookie) = self.cookies.get(key) else {
            return Ok(None);
        };

        let decoded = BASE64_URL_SAFE_NO_PAD
            .decode(cookie.value())
            .map_err(|err| Error::Decode(err.to_string()))?;
        let value = String::from_utf8(decoded).map_err(|err| Error::Decode(err.to_string()))?;

        Ok(Some(value))
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode(value.as_bytes());

        let size = key.len() + 1 + encoded.len();
        if size > self.options.max_size {
            return Err(Error::Encode(format!(
                "cookie `{key}` would be {size} bytes, over the {} byte limit",
                self.options.max_size
            )));
        }

        self.cookies.add(self.build_cookie(key, encoded));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, Error> {
        let existed = self.cookies.get(key).is_some();
        // The removal cookie must carry the same path and domain to match.
        self.cookies.remove(self.build_cookie(key, String::new()));
        Ok(existed)
    }
}

/// Builds a [`CookieStorage`] from the request's [`Cookies`] extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct CookieStorageProvider {
    options: CookieOptions,
}

impl CookieStorageProvider {
    pub fn new(options: CookieOptions) -> Self {
        Self { options }
    }
}

impl StorageProvider for CookieStorageProvider {
    type Storage = CookieStorage;

    fn provide(&self, extensions: &Extensions) -> Option<Self::Storage> {
        let cookies = extensions.get::<Cookies>().cloned();
        if cookies.is_none() {
            tracing::error!("cookies not found in the request extensions");
        }

        cookies.map(|cookies| CookieStorage::new(cookies, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> CookieStorage {
        CookieStorage::new(Cookies::default(), CookieOptions::build().secure(false))
    }

    #[test]
    fn test_json_survives_cookie_encoding() {
        let storage = storage();
        let raw = r#"{"timestamp":1,"serviceType":"hotel","data":{"note":"a; b=c"}}"#;

        storage.set("travelplace_search_hotel", raw.to_string()).unwrap();

        assert_eq!(
            storage.get("travelplace_search_hotel").unwrap().as_deref(),
            Some(raw)
        );
    }

    #[test]
    fn test_remove() {
        let storage = storage();
        storage.set("key", "value".to_string()).unwrap();

        assert!(storage.remove("key").unwrap());
        assert!(storage.get("key").unwrap().is_none());
    }

    #[test]
    fn test_oversized_record_is_refused() {
        let storage = storage();
        let raw = "x".repeat(6000);

        assert!(matches!(
            storage.set("travelplace_search_flight", raw),
            Err(Error::Encode(_))
        ));
        assert!(storage.get("travelplace_search_flight").unwrap().is_none());
    }

    #[test]
    fn test_size_limit_counts_name_and_encoded_value() {
        // "ab" encodes to 3 bytes: "key=" + "YWI" is 7 bytes
        let cookies = Cookies::default();
        let storage = CookieStorage::new(cookies, CookieOptions::build().max_size(7));
        assert!(storage.set("key", "ab".to_string()).is_ok());

        let storage = CookieStorage::new(Cookies::default(), CookieOptions::build().max_size(6));
        assert!(storage.set("key", "ab".to_string()).is_err());
    }

    #[test]
    fn test_cookie_lifetime_outlives_session_ttl() {
        let storage = storage();
        storage.set("travelplace_last_search", "{}".to_string()).unwrap();

        let cookie = storage.cookies.get("travelplace_last_search").unwrap();
        assert_eq!(cookie.max_age(), Some(Duration::days(400)));
    }

    #[test]
    fn test_undecodable_cookie_is_an_error() {
        let cookies = Cookies::default();
        cookies.add(Cookie::new("key", "not base64!"));
        let storage = CookieStorage::new(cookies, CookieOptions::default());

        assert!(matches!(storage.get("key"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_provider_requires_cookies() {
        let provider = CookieStorageProvider::default();
        let mut extensions = Extensions::new();
        assert!(provider.provide(&extensions).is_none());

        extensions.insert(Cookies::default());
        assert!(provider.provide(&extensions).is_some());
    }
}
