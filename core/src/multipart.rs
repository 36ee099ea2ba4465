//! `multipart/form-data` body encoder.
//!
//! # Format
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{key}"\r\n\r\n{value}\r\n      (per parameter)
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{field}"; filename="{name}"\r\n
//! Content-Type: {mime}\r\n\r\n{bytes}\r\n                              (per file)
//! --{boundary}--\r\n
//! ```
//! Parameters come first, then files in the order supplied. The boundary is
//! a fresh random token per body; it is not checked against the content.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mime::{self, OCTET_STREAM};

/// Default form field name for file parts.
pub const FILE_FIELD: &str = "file";

/// How the `Content-Type` of each file part is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeType {
    /// Same type for every file.
    Fixed(String),
    /// Resolved per file from its extension.
    FromExtension,
}

impl Default for MimeType {
    fn default() -> Self {
        MimeType::Fixed(OCTET_STREAM.to_string())
    }
}

/// A multipart upload: text parameters plus file-backed parts.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    parameters: BTreeMap<String, String>,
    file_field_name: String,
    files: Vec<PathBuf>,
    mime_type: MimeType,
    boundary: String,
}

impl MultipartBody {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            parameters: BTreeMap::new(),
            file_field_name: FILE_FIELD.to_string(),
            files: files.into_iter().map(Into::into).collect(),
            mime_type: MimeType::default(),
            boundary: format!("Boundary-{}", Uuid::new_v4().to_string().to_uppercase()),
        }
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_file_field_name(mut self, name: impl Into<String>) -> Self {
        self.file_field_name = name.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: MimeType) -> Self {
        self.mime_type = mime_type;
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Encode the body, reading every file. Fails with [`Error::Io`] on the
    /// first file that cannot be read.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let boundary = &self.boundary;

        for (key, value) in &self.parameters {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{key}\"\r\n\r\n").as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        for path in &self.files {
            let data = fs::read(path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    self.file_field_name,
                    file_name(path)
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", self.mime_for(path)).as_bytes());
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Ok(body)
    }

    fn mime_for(&self, path: &Path) -> &str {
        match &self.mime_type {
            MimeType::Fixed(mime) => mime,
            MimeType::FromExtension => mime::mime_type_for(path),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
