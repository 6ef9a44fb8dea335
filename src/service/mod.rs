//! Checkout middleware for tower applications.
//!
//! This module provides [`CheckoutLayer`], which runs the [`NavigationRouter`] in front
//! of every step handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::LOCATION;
use http::{HeaderValue, Request, Response, StatusCode};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::router::{Checkout, NavigationRouter, StepEntry};
use crate::session::{Clock, SessionOptions, SessionStore, SystemClock};
use crate::store::StorageProvider;

/// A Tower Middleware to use [`Checkout`].
#[derive(Clone, Debug)]
pub struct CheckoutService<S, P> {
    inner: S,
    provider: P,
    options: SessionOptions,
    clock: Arc<dyn Clock>,
}

impl<ReqBody, ResBody, S, P> Service<Request<ReqBody>> for CheckoutService<S, P>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
    P: StorageProvider,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let Some(storage) = self.provider.provide(req.extensions()) else {
            tracing::error!("checkout storage not available for the request");
            return ResponseFuture::ready(empty_response(StatusCode::INTERNAL_SERVER_ERROR));
        };

        let session = SessionStore::new(storage)
            .with_options(self.options)
            .with_clock(Arc::clone(&self.clock));

        match NavigationRouter::new(session.clone()).enter(req.uri()) {
            StepEntry::Redirect(target) => ResponseFuture::ready(redirect_response(&target)),
            StepEntry::Render(view) => {
                req.extensions_mut().insert(Checkout::new(view, session));
                ResponseFuture::inner(self.inner.call(req))
            }
        }
    }
}

/// Layer to apply [`CheckoutService`] middleware.
///
/// # Example
///
/// ```rust
/// use travelplace_checkout::{CheckoutLayer, CookieOptions};
/// use travelplace_checkout::store::CookieStorageProvider;
/// use tower_cookies::CookieManagerLayer;
///
/// let provider = CookieStorageProvider::new(CookieOptions::build().secure(true));
/// let checkout_layer = CheckoutLayer::new(provider);
/// // apply `checkout_layer` first, then `CookieManagerLayer::new()`
/// # let _ = (checkout_layer, CookieManagerLayer::new());
/// ```
#[derive(Clone, Debug)]
pub struct CheckoutLayer<P: StorageProvider> {
    provider: P,
    options: SessionOptions,
    clock: Arc<dyn Clock>,
}

impl<P> CheckoutLayer<P>
where
    P: StorageProvider,
{
    /// Create a new checkout layer.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: SessionOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<S, P> Layer<S> for CheckoutLayer<P>
where
    P: StorageProvider,
{
    type Service = CheckoutService<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        CheckoutService {
            inner,
            provider: self.provider.clone(),
            options: self.options,
            clock: Arc::clone(&self.clock),
        }
    }
}

fn empty_response<B: Default>(status: StatusCode) -> Response<B> {
    let mut response = Response::new(B::default());
    *response.status_mut() = status;
    response
}

fn redirect_response<B: Default>(target: &str) -> Response<B> {
    match HeaderValue::try_from(target) {
        Ok(location) => {
            let mut response = empty_response(StatusCode::SEE_OTHER);
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(err) => {
            tracing::error!(err = %err, "redirect target is not a valid header value");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind<F, B> {
        Inner {
            #[pin]
            future: F,
        },
        Ready {
            response: Option<Response<B>>,
        },
    }
}

pin_project! {
    /// Response future for [`CheckoutService`].
    ///
    /// # Panics
    ///
    /// Polling again after it returned `Ready` panics, as the `Future` contract allows.
    pub struct ResponseFuture<F, B> {
        #[pin]
        kind: Kind<F, B>,
    }
}

impl<F, B> ResponseFuture<F, B> {
    fn inner(future: F) -> Self {
        Self {
            kind: Kind::Inner { future },
        }
    }

    fn ready(response: Response<B>) -> Self {
        Self {
            kind: Kind::Ready {
                response: Some(response),
            },
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::Inner { future } => future.poll(cx),
            KindProj::Ready { response } => {
                Poll::Ready(Ok(response.take().expect("future polled after completion")))
            }
        }
    }
}
