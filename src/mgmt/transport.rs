//! Transport Layer for the management API
//!
//! Design Decision: Abstract transport traits under the connection types
//!
//! ManagementConnection and UploadConnection speak the JSON protocol; how the
//! bytes travel is behind `MgmtTransport` / `ContentTransport`. Production
//! code uses the reqwest implementations below; tests inject mocks.
//!
//! Error Handling:
//! - Connect refused, timeout, HTTP 401: `ProbeError::Transport`
//! - Reply body is not JSON: `ProbeError::Decode`

use async_trait::async_trait;
use futures::stream::{self, Stream};
#[cfg(test)]
use mockall::automock;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ConnectionSettings;
use crate::error::{ProbeError, Result};

/// Path of the JSON management endpoint
pub const MANAGEMENT_PATH: &str = "/management";

/// Path of the multipart content upload endpoint
pub const UPLOAD_PATH: &str = "/management/add-content";

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Source of uploaded content; owned by whoever currently sends it and
/// released when dropped
pub type ContentStream = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Request/reply transport for JSON operations
///
/// Implementations must be safe to share between concurrent callers; one
/// request's body must never interleave with another's.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MgmtTransport: Send + Sync {
    /// Send one JSON request body and return the decoded reply body
    async fn post(&self, body: Value) -> Result<Value>;
}

/// Transport for streamed content upload
#[async_trait]
pub trait ContentTransport: Send + Sync {
    /// Stream `content` to the peer as a multipart file named `filename` and
    /// return the decoded reply body
    ///
    /// `content` is consumed on every path, success or failure.
    async fn send_content(&self, filename: &str, content: ContentStream) -> Result<Value>;
}

fn build_client(settings: &ConnectionSettings) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(settings.timeout())
        .timeout(settings.timeout())
        .build()?)
}

fn describe_send_error(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Transport(format!("request timed out: {}", err))
    } else if err.is_connect() {
        ProbeError::Transport(format!("connection failed: {}", err))
    } else {
        ProbeError::Transport(err.to_string())
    }
}

async fn decode_reply(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ProbeError::Transport(
            "authentication failed (HTTP 401), check user and password".to_string(),
        ));
    }
    let text = response.text().await.map_err(describe_send_error)?;
    serde_json::from_str(&text).map_err(|e| {
        ProbeError::Decode(format!("HTTP {} reply is not valid JSON: {}", status, e))
    })
}

/// JSON-over-HTTP transport with basic authentication
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    user: String,
    password: String,
}

impl HttpTransport {
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
            url: format!("{}{}", settings.base_url(), MANAGEMENT_PATH),
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MgmtTransport for HttpTransport {
    async fn post(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(describe_send_error)?;
        decode_reply(response).await
    }
}

/// Multipart upload transport; the content is streamed in chunks and never
/// held in memory as a whole
#[derive(Clone)]
pub struct HttpUploadTransport {
    client: Client,
    url: String,
    user: String,
    password: String,
}

impl HttpUploadTransport {
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
            url: format!("{}{}", settings.base_url(), UPLOAD_PATH),
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }
}

/// Chunks of `content`; ends after EOF or the first read error
fn chunks(content: ContentStream) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
    stream::unfold(Some(content), |state| async move {
        let mut reader = match state {
            Some(reader) => reader,
            None => return None,
        };
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

#[async_trait]
impl ContentTransport for HttpUploadTransport {
    async fn send_content(&self, filename: &str, content: ContentStream) -> Result<Value> {
        let part = Part::stream(Body::wrap_stream(chunks(content)))
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .multipart(form)
            .send()
            .await
            .map_err(describe_send_error)?;
        decode_reply(response).await
    }
}
