use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};

use crate::router::Checkout;
use crate::store::StorageArea;

/// Axum Extractor for [`Checkout`].
impl<S, T> FromRequestParts<S> for Checkout<T>
where
    S: Sync + Send,
    T: StorageArea,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Checkout<T>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("checkout layer not found in the request extensions");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "checkout not found in the request",
                )
            })
    }
}
