//! Endpoint-to-request compilation.
//!
//! # Design
//! `DefaultRequestCompiler` holds only a base URL and carries no mutable state
//! between calls. Compilation is pure: it reads the endpoint, resolves the URL,
//! merges headers and encodes the task into a `WireRequest`. The only I/O is
//! reading upload files for [`HttpTask::Upload`].
//!
//! Header rules: endpoint headers are merged first and are never overwritten
//! by defaults. Tasks that name a content type outright (`Plain`, JSON
//! `RawBody`, `Upload`) set it unconditionally.

use tracing::{debug, trace};
use url::Url;

use crate::endpoint::{Endpoint, HttpTask, RawBody};
use crate::error::{Error, Result};
use crate::header::{
    Headers, APPLICATION_JSON, CONTENT_LENGTH, CONTENT_TYPE, FORM_URLENCODED, MULTIPART_FORM_DATA,
};
use crate::http::WireRequest;
use crate::params::{self, Parameters};

/// Turns an [`Endpoint`] into a [`WireRequest`].
pub trait RequestCompiler: Send + Sync {
    fn compile(&self, endpoint: &dyn Endpoint) -> Result<WireRequest>;
}

/// Compiler resolving endpoint paths against a fixed base URL.
#[derive(Debug, Clone)]
pub struct DefaultRequestCompiler {
    base_url: Url,
}

impl DefaultRequestCompiler {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Parse `base_url`, failing with [`Error::InvalidUrl`].
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self::new(url))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        if path.is_empty() {
            return Ok(self.base_url.clone());
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(format!("{} cannot take a path", self.base_url)))?;
            segments.pop_if_empty();
            segments.extend(path.trim_start_matches('/').split('/'));
        }
        Ok(url)
    }
}

impl RequestCompiler for DefaultRequestCompiler {
    fn compile(&self, endpoint: &dyn Endpoint) -> Result<WireRequest> {
        let url = self.resolve(&endpoint.path())?;
        let mut request = WireRequest::new(url, endpoint.method(), endpoint.timeout());

        if let Some(headers) = endpoint.headers() {
            request.headers.merge_absent(headers);
        }

        match endpoint.task() {
            HttpTask::Plain { content_type } => {
                request.headers.set(CONTENT_TYPE, content_type);
            }
            HttpTask::RawBody(RawBody::Bytes(bytes)) => {
                request.body = Some(bytes);
            }
            HttpTask::RawBody(RawBody::Json(value)) => {
                let body = serde_json::to_vec(&value).map_err(|e| Error::Encoding(e.to_string()))?;
                request.headers.set(CONTENT_TYPE, APPLICATION_JSON);
                request.body = Some(body);
            }
            HttpTask::Parameters { body, url } => {
                encode_parameters(&mut request, body.as_ref(), url.as_ref())?;
            }
            HttpTask::ParametersWithHeaders { body, url, headers } => {
                if let Some(headers) = headers {
                    request.headers.merge_absent(headers);
                }
                encode_parameters(&mut request, body.as_ref(), url.as_ref())?;
            }
            HttpTask::Encodable(value) => {
                request.body = Some(value.encode()?);
            }
            HttpTask::Upload(multipart) => {
                let body = multipart.build()?;
                request.headers.set(
                    CONTENT_TYPE,
                    format!("{MULTIPART_FORM_DATA}; boundary={}", multipart.boundary()),
                );
                request.headers.set(CONTENT_LENGTH, body.len().to_string());
                request.body = Some(body);
            }
            HttpTask::FormData(parameters) => {
                request.body = Some(params::to_query_string(&parameters)?.into_bytes());
            }
        }

        debug!(
            method = %request.method,
            url = %request.url,
            body_len = request.body.as_ref().map_or(0, Vec::len),
            "compiled request"
        );
        Ok(request)
    }
}

/// URL parameters first, then body parameters; each only when present.
fn encode_parameters(
    request: &mut WireRequest,
    body: Option<&Parameters>,
    url: Option<&Parameters>,
) -> Result<()> {
    if let Some(url) = url {
        encode_url_parameters(request, url)?;
    }
    if let Some(body) = body {
        encode_body_parameters(request, body)?;
    }
    Ok(())
}

fn encode_url_parameters(request: &mut WireRequest, parameters: &Parameters) -> Result<()> {
    if !parameters.is_empty() {
        request.url.set_query(Some(&params::to_query_string(parameters)?));
    }
    default_header(&mut request.headers, CONTENT_TYPE, FORM_URLENCODED);
    Ok(())
}

fn encode_body_parameters(request: &mut WireRequest, parameters: &Parameters) -> Result<()> {
    let body = serde_json::to_vec(parameters).map_err(|e| Error::Encoding(e.to_string()))?;
    request.body = Some(body);
    default_header(&mut request.headers, CONTENT_TYPE, APPLICATION_JSON);
    Ok(())
}

fn default_header(headers: &mut Headers, name: &str, value: &str) {
    if headers.set_if_absent(name, value) {
        trace!(name, value, "defaulted header");
    } else {
        trace!(name, kept = headers.get(name), "kept explicit header");
    }
}
