//! Declarative HTTP client core.
//!
//! # Overview
//! Callers describe each API call as an [`Endpoint`]: a path, a method, a
//! [`HttpTask`] saying how the request carries its data, and optional extra
//! headers. A [`Router`] compiles the endpoint into a [`WireRequest`], hands it
//! to a pluggable [`Transport`], validates the response and delivers the result
//! on one consistent [`DeliveryContext`], either through a callback or as a
//! future.
//!
//! # Design
//! - Compilation is pure and synchronous (`compiler`); it never touches the
//!   network, so every encoding rule is testable without a server.
//! - The transport, delivery context and response classifier are traits;
//!   the bundled `ureq` transport and serial delivery queue are defaults, not
//!   requirements.
//! - Request bodies and decoded responses go through `serde`, with optional
//!   key-case conversion (`codec`).

pub mod classifier;
pub mod codec;
pub mod compiler;
pub mod delivery;
pub mod endpoint;
pub mod error;
pub mod header;
pub mod http;
pub mod mime;
pub mod multipart;
pub mod params;
pub mod router;
pub mod transport;

pub use classifier::{ResponseClassifier, StatusValidator};
pub use codec::KeyCasing;
pub use compiler::{DefaultRequestCompiler, RequestCompiler};
pub use delivery::{DeliveryContext, Inline, SerialQueue};
pub use endpoint::{BasicEndpoint, EncodableBody, Endpoint, HttpTask, RawBody};
pub use error::{Error, Result};
pub use header::Headers;
pub use http::{HttpMethod, ResponseEntry, ResponseMeta, WireRequest};
pub use multipart::{MimeType, MultipartBody};
pub use params::{params, ParamValue, Parameters};
pub use router::{Pending, Router, RouterBuilder};
pub use transport::{TaskHandle, Transport, TransportError, TransportOutcome};

#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
