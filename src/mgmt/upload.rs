//! Content upload for deployments
//!
//! Streams an artifact to the upload endpoint and extracts the content hash
//! from `result.BYTES_VALUE`. The hash is then referenced by `add` or
//! `full-replace-deployment` operations (see [`crate::mgmt::deployment`]).
//!
//! The content stream is moved into [`UploadConnection::upload`], so it is
//! released exactly once whichever way the upload ends.

use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConnectionSettings;
use crate::error::{ProbeError, Result};
use crate::mgmt::operation::BYTES_VALUE;
use crate::mgmt::result::{self, FAILED, RESULT};
use crate::mgmt::transport::{ContentStream, ContentTransport, HttpUploadTransport};

/// Prefix some browsers put in front of uploaded file names
const FAKE_PATH: &str = "C:\\fakepath\\";

/// Why an upload failed
///
/// Preparation failures happen before the peer accepted the content
/// (connect, stream read, HTTP). Execution failures happen after: the reply
/// was unreadable, reported failure, or carried no hash.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadFailure {
    Preparation(String),
    Execution(String),
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailure::Preparation(cause) => {
                write!(f, "Error while preparing for upload: {}", cause)
            }
            UploadFailure::Execution(cause) => write!(f, "Error while executing upload: {}", cause),
        }
    }
}

impl UploadFailure {
    fn from_error(err: ProbeError) -> Self {
        match err {
            ProbeError::Decode(_) | ProbeError::Json(_) | ProbeError::Protocol(_) => {
                UploadFailure::Execution(err.to_string())
            }
            other => UploadFailure::Preparation(other.to_string()),
        }
    }

    /// Failure envelope in the management reply shape
    pub fn to_reply(&self) -> Value {
        json!({
            "outcome": FAILED,
            "failure-description": self.to_string(),
            "rolled-back": true,
        })
    }
}

/// Outcome of one upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReply {
    pub hash: Option<String>,
    pub failure: Option<UploadFailure>,
    /// Reply as received, or a synthesized failure envelope
    pub response: Value,
}

impl UploadReply {
    /// True when the peer returned a content hash
    pub fn is_success(&self) -> bool {
        self.hash.is_some() && self.failure.is_none()
    }

    fn failed(failure: UploadFailure) -> Self {
        Self {
            hash: None,
            response: failure.to_reply(),
            failure: Some(failure),
        }
    }
}

pub struct UploadConnection {
    transport: Arc<dyn ContentTransport>,
}

impl UploadConnection {
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(HttpUploadTransport::new(settings)?),
        })
    }

    pub fn with_transport(transport: Arc<dyn ContentTransport>) -> Self {
        Self { transport }
    }

    /// Upload `content` as `filename` and return the content hash
    ///
    /// Never returns `Err`; failures are reported in the reply.
    pub async fn upload(&self, filename: &str, content: ContentStream) -> UploadReply {
        let filename = strip_fake_path(filename);
        tracing::debug!("Uploading content as [{}]", filename);

        let response = match self.transport.send_content(filename, content).await {
            Ok(response) => response,
            Err(e) => {
                let failure = UploadFailure::from_error(e);
                tracing::warn!("Upload of [{}] failed: {}", filename, failure);
                return UploadReply::failed(failure);
            }
        };

        if result::is_error_reply(&response) {
            let failure =
                UploadFailure::Execution(result::get_failure_description(&response));
            tracing::warn!("Upload of [{}] rejected: {}", filename, failure);
            return UploadReply {
                hash: None,
                failure: Some(failure),
                response,
            };
        }

        match content_hash(&response) {
            Some(hash) => UploadReply {
                hash: Some(hash),
                failure: None,
                response,
            },
            None => {
                let failure = UploadFailure::Execution(format!(
                    "reply has no {}.{}",
                    RESULT, BYTES_VALUE
                ));
                tracing::warn!("Upload of [{}] failed: {}", filename, failure);
                UploadReply {
                    hash: None,
                    failure: Some(failure),
                    response,
                }
            }
        }
    }

    /// Upload a local file, named after its last path component
    pub async fn upload_file(&self, path: &Path) -> UploadReply {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match tokio::fs::File::open(path).await {
            Ok(file) => self.upload(&filename, Box::new(file)).await,
            Err(e) => UploadReply::failed(UploadFailure::Preparation(format!(
                "cannot open {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn strip_fake_path(filename: &str) -> &str {
    filename.strip_prefix(FAKE_PATH).unwrap_or(filename)
}

fn content_hash(response: &Value) -> Option<String> {
    response
        .get(RESULT)?
        .get(BYTES_VALUE)?
        .as_str()
        .map(str::to_string)
}
