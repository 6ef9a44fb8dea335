//! Structural validation of deep-linked checkout paths.
//!
//! The guard only looks at the shape of a path. It never reads session data, so a
//! `payment` or `success` step is entered even when its prerequisites are missing; the
//! step page itself decides how to present that.

use crate::ServiceType;

/// Steps that a page must be able to render without their prerequisite data.
pub const PROTECTED_STEPS: [&str; 2] = ["payment", "success"];

const INSURANCE_ALIAS: &str = "insurance";
const INSURANCE_TARGET: &str = "/travel-insurance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteShape {
    /// `/<segment>/<id>/<step>`
    EntityThenStep,
    /// `/<segment>/<step>`
    StepOnly,
}

struct StepRoute {
    segment: &'static str,
    shape: RouteShape,
    steps: &'static [&'static str],
}

static STEP_ROUTES: [StepRoute; 4] = [
    StepRoute {
        segment: "hotels",
        shape: RouteShape::EntityThenStep,
        steps: &["guests", "payment", "success"],
    },
    StepRoute {
        segment: "car-hire",
        shape: RouteShape::EntityThenStep,
        steps: &["contact", "payment", "success"],
    },
    StepRoute {
        segment: "visa-application",
        shape: RouteShape::StepOnly,
        steps: &[
            "personal",
            "passport",
            "appointment",
            "review",
            "payment",
            "success",
        ],
    },
    StepRoute {
        segment: "travel-insurance",
        shape: RouteShape::StepOnly,
        steps: &["details", "travelers", "review", "payment", "success"],
    },
];

fn step_route(segment: &str) -> Option<&'static StepRoute> {
    STEP_ROUTES.iter().find(|route| route.segment == segment)
}

/// Returns `true` if `id` is a non-empty run of ASCII letters, digits, `_` and `-`.
pub fn is_valid_entity_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Returns the valid steps of a guarded service segment.
pub fn valid_steps(segment: &str) -> Option<&'static [&'static str]> {
    step_route(segment).map(|route| route.steps)
}

/// A checkout path decomposed into its service segment, entity id and step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutPath {
    pub service_segment: String,
    pub entity_id: Option<String>,
    pub step: Option<String>,
}

impl CheckoutPath {
    pub fn new(service_segment: impl Into<String>) -> Self {
        Self {
            service_segment: service_segment.into(),
            ..Default::default()
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Decomposes a request path.
    ///
    /// Entity-routed services (`hotels`, `car-hire`) read `/<segment>/<id>/<step>`,
    /// step-routed services read `/<segment>/<step>`, everything else only yields the
    /// segment. An empty id segment (`/hotels//payment`) is kept as `Some("")`.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim_start_matches('/').trim_end_matches('/');
        let mut segments = trimmed.split('/');
        let service_segment = segments.next().unwrap_or_default().to_string();

        let (entity_id, step) = match step_route(&service_segment).map(|route| route.shape) {
            Some(RouteShape::EntityThenStep) => (
                segments.next().map(str::to_string),
                segments.next().map(str::to_string),
            ),
            Some(RouteShape::StepOnly) => (None, segments.next().map(str::to_string)),
            None => (None, None),
        };

        Self {
            service_segment,
            entity_id,
            step,
        }
    }

    pub fn service(&self) -> Option<ServiceType> {
        ServiceType::from_segment(&self.service_segment)
    }

    pub fn is_protected_step(&self) -> bool {
        self.step
            .as_deref()
            .is_some_and(|step| PROTECTED_STEPS.contains(&step))
    }

    /// Returns `true` if the step is declared for the service, or there is no step.
    pub fn is_known_step(&self) -> bool {
        match (&self.step, valid_steps(&self.service_segment)) {
            (Some(step), Some(steps)) => steps.contains(&step.as_str()),
            _ => true,
        }
    }

    /// Rebuilds the path, e.g. `/hotels/h1/guests`.
    pub fn to_path(&self) -> String {
        let mut path = format!("/{}", self.service_segment);
        for segment in [&self.entity_id, &self.step].into_iter().flatten() {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Outcome of guarding a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepAccessDecision {
    pub allowed: bool,
    pub redirect_to: Option<String>,
}

impl StepAccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            redirect_to: None,
        }
    }

    pub fn redirect(to: impl Into<String>) -> Self {
        Self {
            allowed: false,
            redirect_to: Some(to.into()),
        }
    }
}

/// Decides whether a checkout path may be entered.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepGuard;

impl StepGuard {
    /// Guards an already decomposed path.
    ///
    /// Only a malformed entity id redirects, to the listing page of the segment.
    /// Undeclared steps are left to routing.
    #[tracing::instrument(name = "guarding checkout step", level = "debug")]
    pub fn check(path: &CheckoutPath) -> StepAccessDecision {
        if let Some(entity_id) = path.entity_id.as_deref() {
            if !is_valid_entity_id(entity_id) {
                tracing::debug!("malformed entity id, redirecting to the listing page");
                return StepAccessDecision::redirect(format!("/{}", path.service_segment));
            }
        }

        if !path.is_known_step() {
            tracing::debug!("undeclared step passed through");
        }

        StepAccessDecision::allow()
    }

    /// Guards a raw request path, including the `/insurance` alias.
    pub fn check_path(path: &str) -> StepAccessDecision {
        match alias_target(path) {
            Some(target) => StepAccessDecision::redirect(target),
            None => Self::check(&CheckoutPath::parse(path)),
        }
    }
}

/// Returns the canonical location of an aliased path, keeping any trailing segments.
pub fn alias_target(path: &str) -> Option<String> {
    let rest = path.strip_prefix('/')?.strip_prefix(INSURANCE_ALIAS)?;
    if rest.is_empty() || rest.starts_with('/') {
        return Some(format!("{INSURANCE_TARGET}{rest}"));
    }
    None
}
