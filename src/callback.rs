//! Normalization of payment-gateway return URLs.
//!
//! Gateways hand control back with vendor-specific shapes: the reference arrives as
//! `reference` or `trxref`, and some services used to confirm under an entity-scoped
//! route. Everything collapses to a [`CanonicalCallback`] and one confirmation target.

use std::fmt;

use http::Uri;

use crate::ServiceType;
use crate::guard::is_valid_entity_id;
use crate::params::{Parameters, url_parameters};

pub const REFERENCE_PARAM: &str = "reference";
pub const TRXREF_PARAM: &str = "trxref";
pub const SERVICE_PARAM: &str = "service";
pub const HOTEL_ID_PARAM: &str = "hotelId";

const SUCCESS_SEGMENT: &str = "success";

/// How a service confirms a completed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationRoute {
    /// `/success?service=<service>&reference=<ref>`
    Universal,
    /// `/<segment>/<id>/success?reference=<ref>` when an entity id is known, universal
    /// otherwise.
    EntityScoped,
}

impl ConfirmationRoute {
    pub fn for_service(service: ServiceType) -> Self {
        match service {
            ServiceType::Hotel => ConfirmationRoute::EntityScoped,
            _ => ConfirmationRoute::Universal,
        }
    }

    pub fn build(self, callback: &CanonicalCallback) -> String {
        let entity_id = callback
            .entity_id
            .as_deref()
            .filter(|id| is_valid_entity_id(id));

        match (self, entity_id) {
            (ConfirmationRoute::EntityScoped, Some(entity_id)) => {
                let path = format!(
                    "/{}/{}/{}",
                    callback.service.segment(),
                    entity_id,
                    SUCCESS_SEGMENT
                );
                match callback.reference.as_deref() {
                    Some(reference) => format!(
                        "{path}?{}",
                        encode_query(&[(REFERENCE_PARAM, reference)])
                    ),
                    None => path,
                }
            }
            _ => {
                let mut pairs = vec![(SERVICE_PARAM, callback.service.as_str())];
                if let Some(reference) = callback.reference.as_deref() {
                    pairs.push((REFERENCE_PARAM, reference));
                }
                format!("/{SUCCESS_SEGMENT}?{}", encode_query(&pairs))
            }
        }
    }
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// The normalized result of reading a gateway return URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCallback {
    pub service: ServiceType,
    pub reference: Option<String>,
    pub entity_id: Option<String>,
}

impl CanonicalCallback {
    pub fn new(service: ServiceType) -> Self {
        Self {
            service,
            reference: None,
            entity_id: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Where the checkout continues once the payment is confirmed.
    pub fn confirmation_target(&self) -> String {
        ConfirmationRoute::for_service(self.service).build(self)
    }
}

impl fmt::Display for CanonicalCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.confirmation_target())
    }
}

/// Reads gateway return parameters into a [`CanonicalCallback`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackNormalizer;

impl CallbackNormalizer {
    /// The payment reference, `reference` taking priority over `trxref`.
    pub fn reference(params: &Parameters) -> Option<String> {
        [REFERENCE_PARAM, TRXREF_PARAM]
            .into_iter()
            .filter_map(|name| params.get(name))
            .find(|value| !value.is_empty())
            .cloned()
    }

    /// Builds the callback of `service`; a path entity id wins over `hotelId`.
    pub fn read(
        service: ServiceType,
        entity_id: Option<&str>,
        params: &Parameters,
    ) -> CanonicalCallback {
        let entity_id = entity_id
            .filter(|id| !id.is_empty())
            .or_else(|| params.get(HOTEL_ID_PARAM).map(String::as_str))
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        CanonicalCallback {
            service,
            reference: Self::reference(params),
            entity_id,
        }
    }

    /// Recognizes a gateway return or confirmation URL.
    ///
    /// Accepted paths: `/success?service=..`, `/<segment>[/<id>]/success` and
    /// `/<segment>[/<id>]/payment/callback`.
    #[tracing::instrument(name = "reading payment callback", level = "debug", skip(uri), fields(path = uri.path()))]
    pub fn read_uri(uri: &Uri) -> Option<CanonicalCallback> {
        let params = url_parameters(Some(uri));
        let segments: Vec<&str> = uri
            .path()
            .trim_matches('/')
            .split('/')
            .collect();

        match segments.as_slice() {
            [SUCCESS_SEGMENT] => {
                let service = params
                    .get(SERVICE_PARAM)?
                    .parse::<ServiceType>()
                    .map_err(|err| {
                        tracing::debug!(err = %err, "confirmation route without a known service");
                    })
                    .ok()?;
                Some(Self::read(service, None, &params))
            }
            [segment, rest @ ..] => {
                let service = ServiceType::from_segment(segment)?;
                let entity_id = match rest {
                    [SUCCESS_SEGMENT] | ["payment", "callback"] => None,
                    [id, SUCCESS_SEGMENT] | [id, "payment", "callback"] => Some(*id),
                    _ => return None,
                };
                Some(Self::read(service, entity_id, &params))
            }
            [] => None,
        }
    }

    /// Maps a gateway return URL onto its confirmation target.
    ///
    /// Canonical URLs map onto themselves.
    pub fn normalize_uri(uri: &Uri) -> Option<String> {
        Self::read_uri(uri).map(|callback| callback.confirmation_target())
    }
}
