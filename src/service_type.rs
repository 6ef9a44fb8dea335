use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The travel verticals that run a checkout flow.
///
/// The serialized form (`"car-hire"`, `"travel-insurance"`, ...) is the name used in
/// persisted records and in the `service` query parameter of the confirmation route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Flight,
    Hotel,
    CarHire,
    Visa,
    VisaApplication,
    TravelInsurance,
    Package,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown service type: {0}")]
pub struct UnknownService(pub String);

impl ServiceType {
    pub const ALL: [ServiceType; 7] = [
        ServiceType::Flight,
        ServiceType::Hotel,
        ServiceType::CarHire,
        ServiceType::Visa,
        ServiceType::VisaApplication,
        ServiceType::TravelInsurance,
        ServiceType::Package,
    ];

    /// Returns the wire name of the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Flight => "flight",
            ServiceType::Hotel => "hotel",
            ServiceType::CarHire => "car-hire",
            ServiceType::Visa => "visa",
            ServiceType::VisaApplication => "visa-application",
            ServiceType::TravelInsurance => "travel-insurance",
            ServiceType::Package => "package",
        }
    }

    /// Returns the first path segment under which the service's pages live.
    pub fn segment(&self) -> &'static str {
        match self {
            ServiceType::Flight => "flights",
            ServiceType::Hotel => "hotels",
            ServiceType::CarHire => "car-hire",
            ServiceType::Visa => "visa",
            ServiceType::VisaApplication => "visa-application",
            ServiceType::TravelInsurance => "travel-insurance",
            ServiceType::Package => "packages",
        }
    }

    /// The listing page every failed checkout falls back to.
    pub fn listing_path(&self) -> String {
        format!("/{}", self.segment())
    }

    /// Resolves a service from its route segment, e.g. `hotels`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|service| service.segment() == segment)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| UnknownService(s.to_string()))
    }
}
