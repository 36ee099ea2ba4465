//! Response classification: raw transport outcome to typed result.
//!
//! # Design
//! Mirrors the status check of a hand-written client, generalised to a
//! configurable accepted range. The transport error always takes precedence,
//! even when a response with a status was also reported.

use std::ops::RangeInclusive;

use tracing::debug;

use crate::error::{Error, Result};
use crate::http::ResponseMeta;
use crate::transport::TransportOutcome;

/// Status codes treated as success unless configured otherwise.
pub const DEFAULT_ACCEPT_RANGE: RangeInclusive<u16> = 200..=299;

/// Maps a [`TransportOutcome`] to a typed result. The response metadata is
/// always returned alongside, whatever the outcome.
pub trait ResponseClassifier: Send + Sync {
    fn classify(&self, outcome: TransportOutcome) -> (Result<Vec<u8>>, Option<ResponseMeta>);
}

/// Accepts a response when body and status are present and the status lies
/// in the accepted range.
#[derive(Debug, Clone)]
pub struct StatusValidator {
    accept: RangeInclusive<u16>,
}

impl StatusValidator {
    pub fn new(accept: RangeInclusive<u16>) -> Self {
        Self { accept }
    }

    pub fn accept_range(&self) -> &RangeInclusive<u16> {
        &self.accept
    }
}

impl Default for StatusValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPT_RANGE)
    }
}

impl ResponseClassifier for StatusValidator {
    fn classify(&self, outcome: TransportOutcome) -> (Result<Vec<u8>>, Option<ResponseMeta>) {
        let TransportOutcome { data, response, error } = outcome;

        if let Some(error) = error {
            debug!(%error, "transport failed");
            return (Err(Error::Transport(error)), response);
        }

        let accepted = matches!(
            (&data, &response),
            (Some(_), Some(meta)) if self.accept.contains(&meta.status)
        );
        match data {
            Some(data) if accepted => {
                debug!(status = response.as_ref().map(|m| m.status), len = data.len(), "response accepted");
                (Ok(data), response)
            }
            _ => {
                debug!(status = response.as_ref().map(|m| m.status), "response rejected");
                (Err(Error::InvalidResponse(response.clone())), response)
            }
        }
    }
}
