//! # Travelplace Checkout: booking sessions and payment reconciliation
//!
//! `travelplace-checkout` keeps the client-side state of multi-step travel checkouts
//! (flights, hotels, car hire, visa, insurance, packages) and reconciles payment
//! gateway callbacks into one confirmation contract.
//!
//! - [`SessionStore`] persists step data per [`ServiceType`] with a 24 hour freshness
//!   window, on top of any [`StorageArea`](store::StorageArea).
//! - [`StepGuard`] rejects deep links with malformed identifiers before anything loads.
//! - [`CallbackNormalizer`] folds `reference`/`trxref` returns and legacy success routes
//!   into `/success?service=<service>&reference=<ref>`.
//! - [`PaymentVerifier`] turns a reference into a confirmed or failed outcome and
//!   navigates accordingly.
//! - [`NavigationRouter`] ties them together for each step page, and [`CheckoutLayer`]
//!   runs it as tower middleware.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use travelplace_checkout::{Checkout, CheckoutLayer, CookieOptions};
//! use travelplace_checkout::store::{CookieStorage, CookieStorageProvider};
//! use tower_cookies::CookieManagerLayer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = CookieStorageProvider::new(CookieOptions::build().secure(true));
//!
//!     let app = Router::new()
//!         .route("/hotels/{id}/{step}", get(step))
//!         .layer(CheckoutLayer::new(provider))
//!         .layer(CookieManagerLayer::new()); // CookieManagerLayer must be after
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! async fn step(checkout: Checkout<CookieStorage>) -> String {
//!     let guests: Option<u32> = checkout.get("guests");
//!     format!("{} guest(s)", guests.unwrap_or(1))
//! }
//! ```
//!
//! # Sessions
//!
//! ```rust
//! use serde_json::json;
//! use travelplace_checkout::{ServiceType, SessionStore};
//! use travelplace_checkout::store::MemoryStorage;
//!
//! let session = SessionStore::new(MemoryStorage::new());
//! session
//!     .save_search_data(ServiceType::Flight, &json!({ "from": "LOS", "to": "ACC" }))
//!     .unwrap();
//! session
//!     .store_data(ServiceType::Flight, "selectedPlan", &json!({ "fare": "economy" }))
//!     .unwrap();
//!
//! let plan: Option<serde_json::Value> = session.get_stored_data(ServiceType::Flight, "selectedPlan");
//! assert!(plan.is_some());
//! ```
//!
//! Reads never fail: missing, stale and malformed records all read as `None`.
//!
//! # Important Notes
//!
//! ## Middleware Ordering
//! With the cookie backend, the `CheckoutLayer` must be applied **before** the
//! `CookieManagerLayer`, exactly as for any other `tower-cookies` consumer.
//!
//! ## Shared storage
//! Every tab of an origin sees the same records. Concurrent edits of one service race
//! last-write-wins; nothing locks them.

pub use cookie;

#[cfg(feature = "axum")]
mod extract;

pub mod callback;
pub mod guard;
pub mod params;
pub mod router;
pub mod session;
pub mod store;
pub mod verify;

mod service;
mod service_type;

pub use callback::{CallbackNormalizer, CanonicalCallback, ConfirmationRoute};
pub use guard::{CheckoutPath, StepAccessDecision, StepGuard};
pub use params::{Parameters, url_parameters};
pub use router::{Checkout, NavigationRouter, StepEntry, StepView};
pub use service::*;
pub use service_type::{ServiceType, UnknownService};
pub use session::{CookieOptions, SessionOptions, SessionStore};
pub use verify::{
    FailureReason, NavigationMode, Navigator, Notice, Notifier, PageLifecycle, PaymentVerifier,
    VerificationResponse, VerificationState, VerifyError, VerifyPayment,
};

pub use tower_cookies;
