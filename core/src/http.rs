//! HTTP data types exchanged with the transport.
//!
//! # Design
//! These types describe requests and responses as plain owned data. The
//! compiler produces a `WireRequest` without touching the network; a
//! [`Transport`](crate::transport::Transport) executes it and reports back a
//! `ResponseMeta` plus body bytes. Keeping the I/O boundary explicit keeps
//! compilation and classification deterministic and easy to test.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::header::Headers;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved, ready-to-send request.
///
/// Built once per call by a [`RequestCompiler`](crate::compiler::RequestCompiler)
/// and consumed once by the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl WireRequest {
    pub fn new(url: Url, method: HttpMethod, timeout: Duration) -> Self {
        Self {
            url,
            method,
            headers: Headers::new(),
            body: None,
            timeout,
        }
    }
}

/// Status line and headers of a received response.
///
/// Forwarded to the caller with every outcome, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub url: Url,
    pub status: u16,
    pub headers: Headers,
}

/// Body and metadata of a validated success response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    pub data: Vec<u8>,
    pub response: ResponseMeta,
}
