//! Declarative endpoint descriptions.
//!
//! # Design
//! An API is usually modelled as an enum implementing [`Endpoint`], one
//! variant per call. The library only reads from it while compiling a
//! request and never retains it. [`BasicEndpoint`] covers one-off calls that
//! do not warrant their own type.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::codec::{self, KeyCasing};
use crate::error::Result;
use crate::header::APPLICATION_JSON;
use crate::http::HttpMethod;
use crate::multipart::MultipartBody;
use crate::params::{ParamValue, Parameters};

/// Timeout applied when an endpoint does not override [`Endpoint::timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstract description of one HTTP call.
pub trait Endpoint {
    /// Path appended to the base URL. Empty means the base URL itself.
    fn path(&self) -> String;

    fn method(&self) -> HttpMethod;

    /// Encoding strategy for parameters and body.
    fn task(&self) -> HttpTask;

    /// Extra headers; they win over any default the task would apply.
    fn headers(&self) -> Option<Vec<(String, String)>> {
        None
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

/// Body and parameter encoding strategy of an endpoint.
#[derive(Debug, Clone)]
pub enum HttpTask {
    /// No body; sets `Content-Type`.
    Plain { content_type: String },
    /// Bytes verbatim, or a structured value serialized as JSON.
    RawBody(RawBody),
    /// JSON body parameters and/or URL query parameters.
    Parameters {
        body: Option<Parameters>,
        url: Option<Parameters>,
    },
    /// As `Parameters`, plus headers merged in before encoding.
    ParametersWithHeaders {
        body: Option<Parameters>,
        url: Option<Parameters>,
        headers: Option<Vec<(String, String)>>,
    },
    /// Any `Serialize` value encoded as JSON with a key casing.
    Encodable(EncodableBody),
    /// `multipart/form-data` upload.
    Upload(MultipartBody),
    /// Percent-encoded `name=value&...` body.
    FormData(Parameters),
}

impl HttpTask {
    /// `Plain` with `Content-Type: application/json`.
    pub fn plain() -> Self {
        HttpTask::Plain {
            content_type: APPLICATION_JSON.to_string(),
        }
    }

    pub fn encodable<T>(value: T, casing: KeyCasing) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        HttpTask::Encodable(EncodableBody::new(value, casing))
    }
}

impl Default for HttpTask {
    fn default() -> Self {
        HttpTask::plain()
    }
}

/// Payload of [`HttpTask::RawBody`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    Bytes(Vec<u8>),
    Json(ParamValue),
}

impl From<Vec<u8>> for RawBody {
    fn from(value: Vec<u8>) -> Self {
        RawBody::Bytes(value)
    }
}

impl From<ParamValue> for RawBody {
    fn from(value: ParamValue) -> Self {
        RawBody::Json(value)
    }
}

/// A type-erased `Serialize` value plus the key casing to encode it with.
#[derive(Clone)]
pub struct EncodableBody {
    value: Arc<dyn ErasedSerialize>,
    casing: KeyCasing,
}

impl EncodableBody {
    pub fn new<T>(value: T, casing: KeyCasing) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            casing,
        }
    }

    pub fn casing(&self) -> KeyCasing {
        self.casing
    }

    /// JSON bytes of the value with keys rewritten per the casing.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.value.encode(self.casing)
    }
}

impl fmt::Debug for EncodableBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodableBody")
            .field("casing", &self.casing)
            .finish_non_exhaustive()
    }
}

trait ErasedSerialize: Send + Sync {
    fn encode(&self, casing: KeyCasing) -> Result<Vec<u8>>;
}

impl<T: Serialize + Send + Sync> ErasedSerialize for T {
    fn encode(&self, casing: KeyCasing) -> Result<Vec<u8>> {
        codec::encode(self, casing)
    }
}

/// Plain-data [`Endpoint`] built with chained setters.
#[derive(Debug, Clone)]
pub struct BasicEndpoint {
    path: String,
    method: HttpMethod,
    task: HttpTask,
    headers: Option<Vec<(String, String)>>,
    timeout: Duration,
}

impl BasicEndpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            task: HttpTask::plain(),
            headers: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_task(mut self, task: HttpTask) -> Self {
        self.task = task;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Endpoint for BasicEndpoint {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn task(&self) -> HttpTask {
        self.task.clone()
    }

    fn headers(&self) -> Option<Vec<(String, String)>> {
        self.headers.clone()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
