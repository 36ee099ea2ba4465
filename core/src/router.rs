//! Router: compile, send, classify, deliver.
//!
//! # Design
//! A `Router` owns a request compiler, a transport, a delivery context and a
//! response classifier, all behind one `Arc` so clones are cheap and share
//! everything. Every call shape is built on [`Router::perform_task`]:
//!
//! 1. compile the endpoint; on failure, complete synchronously with no
//!    response and never touch the transport;
//! 2. hand the request to the transport;
//! 3. when the transport completes, redispatch onto the delivery context,
//!    classify there, and invoke the caller's completion.
//!
//! In-flight transport completions hold only a weak reference to the router.
//! Once every clone of a router is dropped, completions that arrive later are
//! discarded without calling the caller back. The `fetch_*` shapes then
//! resolve to [`Error::Abandoned`].
//!
//! The `fetch_*` shapes share one bridge: a oneshot channel fed by the
//! callback shape, wrapped in [`Pending`].

use std::future::Future;
use std::ops::RangeInclusive;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{ready, Context, Poll};

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::classifier::{ResponseClassifier, StatusValidator};
use crate::codec::{self, KeyCasing};
use crate::compiler::{DefaultRequestCompiler, RequestCompiler};
use crate::delivery::{DeliveryContext, SerialQueue};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::{ResponseEntry, ResponseMeta};
use crate::transport::{TaskHandle, Transport};

const DELIVERY_QUEUE_NAME: &str = "courier-delivery";

type Resume<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Dispatches endpoints through a transport and delivers typed results.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

struct Inner {
    compiler: Box<dyn RequestCompiler>,
    transport: Box<dyn Transport>,
    delivery: Arc<dyn DeliveryContext>,
    classifier: Arc<dyn ResponseClassifier>,
}

impl Router {
    /// Router for `base_url` with the default transport, delivery queue and
    /// `200..=299` status validation.
    #[cfg(feature = "ureq")]
    pub fn new(base_url: &str) -> Result<Self> {
        Self::builder(base_url)?.build()
    }

    /// Builder resolving endpoints against `base_url`. Fails with
    /// [`Error::InvalidUrl`] if it does not parse.
    pub fn builder(base_url: &str) -> Result<RouterBuilder> {
        Ok(Self::with_compiler(DefaultRequestCompiler::parse(base_url)?))
    }

    /// Builder around a pre-built request compiler.
    pub fn with_compiler(compiler: impl RequestCompiler + 'static) -> RouterBuilder {
        RouterBuilder {
            compiler: Box::new(compiler),
            transport: None,
            delivery: None,
            classifier: None,
        }
    }

    /// Send `endpoint` and deliver the classified result together with the
    /// response metadata.
    ///
    /// Returns `None` when compilation fails; `completion` has then already
    /// run on the calling thread.
    pub fn perform_task<F>(&self, endpoint: &dyn Endpoint, completion: F) -> Option<Box<dyn TaskHandle>>
    where
        F: FnOnce(Result<Vec<u8>>, Option<ResponseMeta>) + Send + 'static,
    {
        let request = match self.inner.compiler.compile(endpoint) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "compilation failed, transport not engaged");
                completion(Err(err), None);
                return None;
            }
        };

        let router: Weak<Inner> = Arc::downgrade(&self.inner);
        let url: Url = request.url.clone();
        let handle = self.inner.transport.send(
            request,
            Box::new(move |outcome| {
                let Some(inner) = router.upgrade() else {
                    warn!(%url, "router dropped before completion, discarding result");
                    return;
                };
                let classifier = Arc::clone(&inner.classifier);
                let delivery = Arc::clone(&inner.delivery);
                drop(inner);
                delivery.deliver(Box::new(move || {
                    let (result, response) = classifier.classify(outcome);
                    completion(result, response);
                }));
            }),
        );
        Some(handle)
    }

    /// As [`perform_task`](Self::perform_task), without the response metadata.
    pub fn perform_data_task<F>(&self, endpoint: &dyn Endpoint, completion: F) -> Option<Box<dyn TaskHandle>>
    where
        F: FnOnce(Result<Vec<u8>>) + Send + 'static,
    {
        self.perform_task(endpoint, move |result, _| completion(result))
    }

    /// Decode a successful body into `T`. A body that does not fit `T`
    /// fails with [`Error::Decoding`].
    pub fn perform_decoding_task<T, F>(
        &self,
        endpoint: &dyn Endpoint,
        casing: KeyCasing,
        completion: F,
    ) -> Option<Box<dyn TaskHandle>>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.perform_task(endpoint, move |result, _| {
            completion(result.and_then(|data| codec::decode(&data, casing)))
        })
    }

    /// Report only success or failure; the body is discarded.
    pub fn perform_void_task<F>(&self, endpoint: &dyn Endpoint, completion: F) -> Option<Box<dyn TaskHandle>>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.perform_task(endpoint, move |result, _| completion(result.map(drop)))
    }

    /// Body and response metadata of a validated success.
    ///
    /// The request is started when this is called; the returned [`Pending`]
    /// only waits for it.
    pub fn fetch_entry(&self, endpoint: &dyn Endpoint) -> Pending<ResponseEntry> {
        suspend(|resume| {
            self.perform_task(endpoint, move |result, response| {
                resume(result.and_then(|data| match response {
                    Some(response) => Ok(ResponseEntry { data, response }),
                    None => Err(Error::InvalidResponse(None)),
                }))
            })
        })
    }

    /// Body bytes of a validated success. See [`fetch_entry`](Self::fetch_entry).
    pub fn fetch_data(&self, endpoint: &dyn Endpoint) -> Pending<Vec<u8>> {
        suspend(|resume| self.perform_data_task(endpoint, resume))
    }

    /// Body decoded into `T`. See [`fetch_entry`](Self::fetch_entry).
    pub fn fetch_decoded<T>(&self, endpoint: &dyn Endpoint, casing: KeyCasing) -> Pending<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        suspend(|resume| self.perform_decoding_task(endpoint, casing, resume))
    }

    /// Success or failure only. See [`fetch_entry`](Self::fetch_entry).
    pub fn fetch_void(&self, endpoint: &dyn Endpoint) -> Pending<()> {
        suspend(|resume| self.perform_void_task(endpoint, resume))
    }
}

/// Bridge a callback-style call into a future resolving once with its result.
fn suspend<T, S>(start: S) -> Pending<T>
where
    T: Send + 'static,
    S: FnOnce(Resume<T>) -> Option<Box<dyn TaskHandle>>,
{
    let (tx, rx) = oneshot::channel();
    let handle = start(Box::new(move |result| {
        let _ = tx.send(result);
    }));
    Pending { rx, handle }
}

/// Result of an in-flight `fetch_*` call.
///
/// Resolves once. If the router is dropped before the transport completes,
/// it resolves to [`Error::Abandoned`]. Dropping it before it resolves
/// cancels the transport task.
#[must_use = "dropping a pending call cancels it"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
    handle: Option<Box<dyn TaskHandle>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let result = ready!(Pin::new(&mut this.rx).poll(cx));
        this.handle = None;
        Poll::Ready(result.unwrap_or(Err(Error::Abandoned)))
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("in_flight", &self.handle.is_some())
            .finish()
    }
}

/// Configures a [`Router`].
pub struct RouterBuilder {
    compiler: Box<dyn RequestCompiler>,
    transport: Option<Box<dyn Transport>>,
    delivery: Option<Arc<dyn DeliveryContext>>,
    classifier: Option<Arc<dyn ResponseClassifier>>,
}

impl RouterBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Where completions run. Defaults to a dedicated serial queue.
    pub fn delivery(mut self, delivery: impl DeliveryContext + 'static) -> Self {
        self.delivery = Some(Arc::new(delivery));
        self
    }

    pub fn classifier(mut self, classifier: impl ResponseClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Shorthand for a [`StatusValidator`] accepting `range`.
    pub fn accept_statuses(self, range: RangeInclusive<u16>) -> Self {
        self.classifier(StatusValidator::new(range))
    }

    pub fn build(self) -> Result<Router> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let delivery: Arc<dyn DeliveryContext> = match self.delivery {
            Some(delivery) => delivery,
            None => Arc::new(
                SerialQueue::new(DELIVERY_QUEUE_NAME)
                    .map_err(|e| Error::Config(format!("failed to start delivery queue: {e}")))?,
            ),
        };
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(StatusValidator::default()));

        Ok(Router {
            inner: Arc::new(Inner {
                compiler: self.compiler,
                transport,
                delivery,
                classifier,
            }),
        })
    }
}

#[cfg(feature = "ureq")]
fn default_transport() -> Result<Box<dyn Transport>> {
    Ok(Box::new(crate::transport::UreqTransport::new()))
}

#[cfg(not(feature = "ureq"))]
fn default_transport() -> Result<Box<dyn Transport>> {
    Err(Error::Config("no transport configured".to_string()))
}
