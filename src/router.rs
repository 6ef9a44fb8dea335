//! Per-step orchestration: guard, then session, then render or redirect.

use std::result;

use http::Uri;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::guard::{CheckoutPath, StepGuard, alias_target};
use crate::params::{Parameters, url_parameters};
use crate::session::{self, SessionStore};
use crate::store::StorageArea;
use crate::ServiceType;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] session::Error),
    #[error("`/{0}` is not a checkout service")]
    UnknownService(String),
}

type Result<T> = result::Result<T, Error>;

/// Merges URL parameters over stored step data.
///
/// URL values win key for key and are kept as JSON strings; stored values fill the
/// gaps. A stored payload that is not an object contributes nothing.
pub fn merge_parameters(params: Parameters, stored: Option<Value>) -> Map<String, Value> {
    let mut data = match stored {
        Some(Value::Object(stored)) => stored,
        _ => Map::new(),
    };
    for (key, value) in params {
        data.insert(key, Value::String(value));
    }
    data
}

/// The data a step page renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub path: CheckoutPath,
    pub service: Option<ServiceType>,
    pub data: Map<String, Value>,
}

impl StepView {
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.data
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

/// What a step page should do on entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEntry {
    Redirect(String),
    Render(StepView),
}

#[derive(Debug, Clone)]
pub struct NavigationRouter<S: StorageArea> {
    session: SessionStore<S>,
}

impl<S> NavigationRouter<S>
where
    S: StorageArea,
{
    pub fn new(session: SessionStore<S>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    /// Decides how a navigation to `uri` is served.
    ///
    /// The guard runs first; a redirect never touches the session.
    #[tracing::instrument(name = "entering checkout step", skip(self, uri), fields(path = uri.path()))]
    pub fn enter(&self, uri: &Uri) -> StepEntry {
        if let Some(target) = alias_target(uri.path()) {
            let target = match uri.query() {
                Some(query) => format!("{target}?{query}"),
                None => target,
            };
            return StepEntry::Redirect(target);
        }

        let path = CheckoutPath::parse(uri.path());
        let decision = StepGuard::check(&path);
        if !decision.allowed {
            let target = decision.redirect_to.unwrap_or_else(|| "/".to_string());
            tracing::debug!(location = %target, "step not allowed");
            return StepEntry::Redirect(target);
        }

        let service = path.service();
        let stored = service.and_then(|service| self.session.get_search_data::<Value>(service));
        let data = merge_parameters(url_parameters(Some(uri)), stored);

        StepEntry::Render(StepView {
            path,
            service,
            data,
        })
    }

    /// Persists `value` under `key` for the step's service and returns the path of
    /// `next_step`.
    #[tracing::instrument(name = "advancing checkout step", skip(self, view, value))]
    pub fn advance<T>(&self, view: &StepView, key: &str, value: &T, next_step: &str) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let service = view
            .service
            .ok_or_else(|| Error::UnknownService(view.path.service_segment.clone()))?;

        self.session.store_data(service, key, value)?;

        Ok(view.path.clone().with_step(next_step).to_path())
    }
}

/// The checkout context of one request: the step view and its session.
///
/// Inserted into the request extensions by [`CheckoutLayer`](crate::CheckoutLayer).
#[derive(Debug, Clone)]
pub struct Checkout<S: StorageArea> {
    view: StepView,
    router: NavigationRouter<S>,
}

impl<S> Checkout<S>
where
    S: StorageArea,
{
    pub fn new(view: StepView, session: SessionStore<S>) -> Self {
        Self {
            view,
            router: NavigationRouter::new(session),
        }
    }

    pub fn view(&self) -> &StepView {
        &self.view
    }

    pub fn service(&self) -> Option<ServiceType> {
        self.view.service
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.view.get(key)
    }

    pub fn session(&self) -> &SessionStore<S> {
        self.router.session()
    }

    /// See [`NavigationRouter::advance`].
    pub fn advance<T>(&self, key: &str, value: &T, next_step: &str) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        self.router.advance(&self.view, key, value, next_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_wins_stored_fills_gaps() {
        let params = Parameters::from([("a".to_string(), "1".to_string())]);
        let merged = merge_parameters(params, Some(json!({ "a": 2, "b": 3 })));

        assert_eq!(Value::Object(merged), json!({ "a": "1", "b": 3 }));
    }

    #[test]
    fn test_non_object_payload_is_ignored() {
        let params = Parameters::from([("a".to_string(), "1".to_string())]);
        let merged = merge_parameters(params, Some(json!([1, 2])));

        assert_eq!(Value::Object(merged), json!({ "a": "1" }));
    }
}
