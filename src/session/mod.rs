//! Per-service checkout sessions with a freshness window.

use std::result;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

mod clock;
mod cookie_options;

use crate::ServiceType;
use crate::store::{self, StorageArea};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie_options::CookieOptions;

pub(crate) const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
}

type Result<T> = result::Result<T, Error>;

/// The envelope persisted for every save.
///
/// `timestamp` is the time of the last write, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub timestamp: i64,
    #[serde(rename = "serviceType")]
    pub service_type: ServiceType,
    pub data: Value,
}

/// Configuration options for a [`SessionStore`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use travelplace_checkout::SessionOptions;
///
/// let options = SessionOptions::build()
///     .ttl(Duration::from_secs(12 * 60 * 60))
///     .key_prefix("travelplace_search_");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub ttl: Duration,
    pub key_prefix: &'static str,
    pub last_search_key: &'static str,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS as u64),
            key_prefix: "travelplace_search_",
            last_search_key: "travelplace_last_search",
        }
    }
}

impl SessionOptions {
    /// Creates a new `SessionOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Records older than `ttl` are treated as absent.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key_prefix(mut self, prefix: &'static str) -> Self {
        self.key_prefix = prefix;
        self
    }

    pub fn last_search_key(mut self, key: &'static str) -> Self {
        self.last_search_key = key;
        self
    }

    /// The storage key holding the record of `service`.
    pub fn key_for(&self, service: ServiceType) -> String {
        format!("{}{}", self.key_prefix, service)
    }
}

/// Step data of every service, persisted in a [`StorageArea`].
///
/// Reads never fail: absent, stale or malformed records all read as `None`. Stale
/// records are left in place and simply ignored until the next save replaces them.
#[derive(Debug, Clone)]
pub struct SessionStore<S: StorageArea> {
    storage: S,
    options: SessionOptions,
    clock: Arc<dyn Clock>,
}

impl<S> SessionStore<S>
where
    S: StorageArea,
{
    /// Creates a new `SessionStore` with default options and the system clock.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            options: SessionOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Replaces the record of `service` with `data` and mirrors it into the last-search
    /// record.
    #[tracing::instrument(name = "saving search data", skip(self, data))]
    pub fn save_search_data<T>(&self, service: ServiceType, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        self.write_record(service, data)
    }

    /// Returns the payload of `service` if it was written within the TTL.
    #[tracing::instrument(name = "getting search data", skip(self))]
    pub fn get_search_data<T>(&self, service: ServiceType) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let record = self.fresh_record(service)?;
        serde_json::from_value(record.data)
            .map_err(|err| {
                tracing::warn!(err = %err, "search data does not match the requested shape");
            })
            .ok()
    }

    /// Returns a single step value of `service`.
    #[tracing::instrument(name = "getting step data", skip(self))]
    pub fn get_stored_data<T>(&self, service: ServiceType, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let record = self.fresh_record(service)?;
        let value = match record.data {
            Value::Object(mut steps) => steps.remove(key)?,
            _ => return None,
        };

        serde_json::from_value(value)
            .map_err(|err| {
                tracing::warn!(err = %err, "step data does not match the requested shape");
            })
            .ok()
    }

    /// Sets a single step value of `service`, keeping the sibling steps.
    ///
    /// A stale record contributes no siblings. The whole record is rewritten, so
    /// its timestamp is refreshed.
    #[tracing::instrument(name = "storing step data", skip(self, value))]
    pub fn store_data<T>(&self, service: ServiceType, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut steps = match self.fresh_record(service).map(|record| record.data) {
            Some(Value::Object(steps)) => steps,
            Some(_) => {
                tracing::debug!("replacing a non-object payload with step data");
                Map::new()
            }
            None => Map::new(),
        };
        steps.insert(key.to_string(), serde_json::to_value(value)?);

        self.write_record(service, Value::Object(steps))
    }

    /// Returns the most recently saved search across all services, however old.
    #[tracing::instrument(name = "getting last search", skip(self))]
    pub fn last_search<T>(&self) -> Option<(ServiceType, T)>
    where
        T: DeserializeOwned,
    {
        let record = self.read_record(self.options.last_search_key)?;
        let data = serde_json::from_value(record.data)
            .map_err(|err| {
                tracing::warn!(err = %err, "last search does not match the requested shape");
            })
            .ok()?;

        Some((record.service_type, data))
    }

    fn write_record(&self, service: ServiceType, data: Value) -> Result<()> {
        let record = SearchRecord {
            timestamp: self.clock.now_millis(),
            service_type: service,
            data,
        };
        let raw = serde_json::to_string(&record)?;

        self.storage
            .set(&self.options.key_for(service), raw.clone())
            .map_err(|err| {
                tracing::error!(err = %err, "failed to save search data");
                err
            })?;
        self.storage
            .set(self.options.last_search_key, raw)
            .map_err(|err| {
                tracing::error!(err = %err, "failed to save last search");
                err
            })?;

        Ok(())
    }

    fn fresh_record(&self, service: ServiceType) -> Option<SearchRecord> {
        let record = self.read_record(&self.options.key_for(service))?;
        let age = self.clock.now_millis().saturating_sub(record.timestamp);
        let ttl = u64::try_from(self.options.ttl.as_millis()).unwrap_or(u64::MAX);

        // a record stamped ahead of this clock gets the same window
        if age.unsigned_abs() >= ttl {
            tracing::debug!(age_ms = age, "ignoring stale search data");
            return None;
        }

        Some(record)
    }

    fn read_record(&self, key: &str) -> Option<SearchRecord> {
        let raw = self
            .storage
            .get(key)
            .map_err(|err| {
                tracing::warn!(err = %err, key, "failed to read persisted session data");
            })
            .ok()??;

        serde_json::from_str(&raw)
            .map_err(|err| {
                tracing::warn!(err = %err, key, "discarding malformed session data");
            })
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn store() -> (SessionStore<MemoryStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = SessionStore::new(MemoryStorage::new()).with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn test_envelope_format() {
        let (store, _) = store();
        store
            .save_search_data(ServiceType::CarHire, &json!({ "pickup": "LOS" }))
            .unwrap();

        let raw = store
            .storage()
            .get("travelplace_search_car-hire")
            .unwrap()
            .unwrap();
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            envelope,
            json!({ "timestamp": NOW, "serviceType": "car-hire", "data": { "pickup": "LOS" } })
        );

        let last = store.storage().get("travelplace_last_search").unwrap();
        assert_eq!(last, Some(raw));
    }

    #[test]
    fn test_ttl_boundary() {
        let (store, clock) = store();
        store
            .save_search_data(ServiceType::Flight, &json!({ "from": "LOS" }))
            .unwrap();

        clock.advance(Duration::from_secs(DEFAULT_TTL_SECS as u64) - Duration::from_millis(1));
        assert!(store.get_search_data::<Value>(ServiceType::Flight).is_some());

        clock.advance(Duration::from_millis(1));
        assert!(store.get_search_data::<Value>(ServiceType::Flight).is_none());

        // lazy expiry leaves the record where it was
        assert!(
            store
                .storage()
                .get("travelplace_search_flight")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_future_timestamp_is_bounded_by_ttl() {
        let (store, _) = store();
        let day = DEFAULT_TTL_SECS * 1000;
        let write = |timestamp: i64| {
            let record = json!({ "timestamp": timestamp, "serviceType": "hotel", "data": { "city": "Accra" } });
            store
                .storage()
                .set("travelplace_search_hotel", record.to_string())
                .unwrap();
        };

        write(NOW + 60_000);
        assert!(store.get_search_data::<Value>(ServiceType::Hotel).is_some());

        write(NOW + day);
        assert!(store.get_search_data::<Value>(ServiceType::Hotel).is_none());

        write(i64::MAX);
        assert!(store.get_search_data::<Value>(ServiceType::Hotel).is_none());
    }

    #[test]
    fn test_unbounded_ttl_keeps_records_fresh() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = SessionStore::new(MemoryStorage::new())
            .with_clock(clock.clone())
            .with_options(SessionOptions::build().ttl(Duration::MAX));
        store
            .save_search_data(ServiceType::Flight, &json!({ "from": "LOS" }))
            .unwrap();

        clock.advance(Duration::from_secs(10 * 365 * 24 * 60 * 60));
        assert!(store.get_search_data::<Value>(ServiceType::Flight).is_some());
    }

    #[test]
    fn test_malformed_record_reads_as_none() {
        let (store, _) = store();
        store
            .storage()
            .set("travelplace_search_hotel", "{not json".to_string())
            .unwrap();

        assert!(store.get_search_data::<Value>(ServiceType::Hotel).is_none());
        assert!(
            store
                .get_stored_data::<Value>(ServiceType::Hotel, "guests")
                .is_none()
        );
    }

    #[test]
    fn test_store_data_replaces_scalar_payload() {
        let (store, _) = store();
        store
            .save_search_data(ServiceType::Visa, &"just a string")
            .unwrap();
        store
            .store_data(ServiceType::Visa, "country", &"GH")
            .unwrap();

        assert_eq!(
            store.get_search_data::<Value>(ServiceType::Visa),
            Some(json!({ "country": "GH" }))
        );
    }

    #[test]
    fn test_custom_options() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = SessionStore::new(MemoryStorage::new())
            .with_clock(clock.clone())
            .with_options(
                SessionOptions::build()
                    .ttl(Duration::from_secs(60))
                    .key_prefix("tp_")
                    .last_search_key("tp_last"),
            );

        store
            .save_search_data(ServiceType::Package, &json!({ "id": 7 }))
            .unwrap();
        assert!(store.storage().get("tp_package").unwrap().is_some());
        assert!(store.storage().get("tp_last").unwrap().is_some());

        clock.advance(Duration::from_secs(61));
        assert!(store.get_search_data::<Value>(ServiceType::Package).is_none());
        assert_eq!(
            store.last_search::<Value>(),
            Some((ServiceType::Package, json!({ "id": 7 })))
        );
    }
}
