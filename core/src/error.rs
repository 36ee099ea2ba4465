//! Error types for the endpoint router.
//!
//! # Design
//! Compilation failures (`InvalidUrl`, `Encoding`, `Io`) never reach the
//! transport, but they are delivered through the same completion contract as
//! transport failures. Callers tell "never sent" apart from "sent and failed"
//! by the variant and by the absence of response metadata.
//!
//! `InvalidResponse` carries the response metadata when one was received so
//! callers can inspect the rejected status code.

use std::io;
use std::path::PathBuf;

use crate::http::ResponseMeta;
use crate::transport::TransportError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while compiling, sending, classifying or decoding a call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The base URL or a URL derived from it could not be parsed or extended.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A parameter mapping or structured body is not serializable.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// A file referenced by a multipart body could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The transport succeeded but the response was rejected: status outside
    /// the accepted range, or body/metadata missing.
    #[error("invalid response{}", status_suffix(.0))]
    InvalidResponse(Option<ResponseMeta>),

    /// Response bytes did not parse into the expected type.
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// The router could not be assembled from its configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Passthrough error reported by the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The completion was dropped without running, because the router was
    /// released while the call was in flight.
    #[error("call abandoned before completion")]
    Abandoned,
}

impl Error {
    /// Response metadata attached to the error, if any.
    pub fn response(&self) -> Option<&ResponseMeta> {
        match self {
            Error::InvalidResponse(meta) => meta.as_ref(),
            _ => None,
        }
    }
}

fn status_suffix(meta: &Option<ResponseMeta>) -> String {
    match meta {
        Some(meta) => format!(": HTTP {}", meta.status),
        None => String::new(),
    }
}
