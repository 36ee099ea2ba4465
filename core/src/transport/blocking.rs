//! Blocking `ureq` transport running each request on its own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, warn};
use ureq::typestate::{WithBody, WithoutBody};
use ureq::ResponseExt;
use url::Url;

use crate::header::{Headers, CONTENT_LENGTH};
use crate::http::{HttpMethod, ResponseMeta, WireRequest};
use crate::transport::{Completion, TaskHandle, Transport, TransportError, TransportOutcome};

/// [`Transport`] backed by `ureq`.
///
/// HTTP status codes are never treated as errors here; accepting or
/// rejecting a status is the classifier's job. The request timeout is applied
/// as a global timeout on a per-request agent.
///
/// Cancelling completes the call with [`TransportError::Cancelled`] right
/// away. The worker thread still runs the blocking request to its end but its
/// result is discarded.
///
/// Response bodies are read in full with no size cap unless one is set with
/// [`with_max_body_size`](Self::with_max_body_size). Redirects are followed,
/// and the response metadata carries the final URL.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    thread_name: String,
    max_body_size: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            thread_name: "courier-ureq".to_string(),
            max_body_size: u64::MAX,
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Fail with [`TransportError::Other`] once a response body exceeds
    /// `limit` bytes. The status and headers are still reported.
    pub fn with_max_body_size(mut self, limit: u64) -> Self {
        self.max_body_size = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: WireRequest, completion: Completion) -> Box<dyn TaskHandle> {
        let task = Arc::new(UreqTask {
            cancelled: AtomicBool::new(false),
            completion: Mutex::new(Some(completion)),
        });

        let worker = Arc::clone(&task);
        let max_body_size = self.max_body_size;
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                debug!(method = %request.method, url = %request.url, "transport task started");
                let outcome = execute(&request, max_body_size);
                worker.complete(outcome);
            });

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn transport thread");
            task.complete(TransportOutcome::failure(TransportError::Other(err.to_string())));
        }

        Box::new(UreqHandle(task))
    }
}

struct UreqTask {
    cancelled: AtomicBool,
    completion: Mutex<Option<Completion>>,
}

impl UreqTask {
    /// Run the completion if nobody has yet.
    fn complete(&self, outcome: TransportOutcome) {
        let completion = match self.completion.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(completion) = completion {
            completion(outcome);
        }
    }
}

struct UreqHandle(Arc<UreqTask>);

impl TaskHandle for UreqHandle {
    fn cancel(&self) {
        if !self.0.cancelled.swap(true, Ordering::AcqRel) {
            self.0.complete(TransportOutcome::failure(TransportError::Cancelled));
        }
    }

    fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

fn execute(request: &WireRequest, max_body_size: u64) -> TransportOutcome {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(request.timeout))
        .build()
        .new_agent();

    let url = request.url.as_str();
    let body = request.body.as_deref();
    let result = match request.method {
        HttpMethod::Get => send_without_body(with_headers(agent.get(url), &request.headers), body),
        HttpMethod::Delete => send_without_body(with_headers(agent.delete(url), &request.headers), body),
        HttpMethod::Post => send_with_body(with_headers(agent.post(url), &request.headers), body),
        HttpMethod::Put => send_with_body(with_headers(agent.put(url), &request.headers), body),
        HttpMethod::Patch => send_with_body(with_headers(agent.patch(url), &request.headers), body),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(err) => return TransportOutcome::failure(map_error(err)),
    };

    let mut headers = Headers::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }
    let url = Url::parse(&response.get_uri().to_string()).unwrap_or_else(|_| request.url.clone());
    let meta = ResponseMeta {
        url,
        status: response.status().as_u16(),
        headers,
    };

    match response.body_mut().with_config().limit(max_body_size).read_to_vec() {
        Ok(data) => TransportOutcome::success(data, meta),
        Err(err) => TransportOutcome {
            data: None,
            response: Some(meta),
            error: Some(map_error(err)),
        },
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    // ureq derives Content-Length from the body it sends.
    for (name, value) in headers.iter().filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_LENGTH)) {
        builder = builder.header(name, value);
    }
    builder
}

fn send_without_body(
    builder: ureq::RequestBuilder<WithoutBody>,
    body: Option<&[u8]>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body),
        None => builder.call(),
    }
}

fn send_with_body(
    builder: ureq::RequestBuilder<WithBody>,
    body: Option<&[u8]>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}

fn map_error(err: ureq::Error) -> TransportError {
    use std::io::ErrorKind;

    match &err {
        ureq::Error::Timeout(_) => TransportError::TimedOut,
        ureq::Error::Io(io) if io.kind() == ErrorKind::TimedOut => TransportError::TimedOut,
        ureq::Error::Io(io)
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ) =>
        {
            TransportError::Connect(err.to_string())
        }
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => TransportError::Connect(err.to_string()),
        _ => TransportError::Other(err.to_string()),
    }
}
