//! Transport seam: the capability that physically sends a [`WireRequest`].
//!
//! # Design
//! The router never performs I/O itself. A `Transport` receives a compiled
//! request plus a one-shot completion and reports back whatever it got: body
//! bytes, response metadata, a transport error, or any combination. The
//! returned [`TaskHandle`] is the only cancellation lever; what cancelling
//! means is up to the transport.
//!
//! A transport must invoke each completion at most once. It may do so on any
//! thread; the router redispatches onto its delivery context.

#[cfg(feature = "ureq")]
mod blocking;

#[cfg(feature = "ureq")]
pub use blocking::UreqTransport;

use crate::http::{ResponseMeta, WireRequest};

/// Raw result of one transport round-trip, before classification.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub data: Option<Vec<u8>>,
    pub response: Option<ResponseMeta>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    pub fn success(data: Vec<u8>, response: ResponseMeta) -> Self {
        Self {
            data: Some(data),
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Errors reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    TimedOut,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// One-shot completion handed to [`Transport::send`].
pub type Completion = Box<dyn FnOnce(TransportOutcome) + Send + 'static>;

/// Handle to an in-flight transport task.
pub trait TaskHandle: Send + Sync {
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// Sends compiled requests.
pub trait Transport: Send + Sync {
    fn send(&self, request: WireRequest, completion: Completion) -> Box<dyn TaskHandle>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: WireRequest, completion: Completion) -> Box<dyn TaskHandle> {
        (**self).send(request, completion)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: WireRequest, completion: Completion) -> Box<dyn TaskHandle> {
        (**self).send(request, completion)
    }
}
