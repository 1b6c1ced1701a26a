//! Management Connection
//!
//! Executes [`Operation`]s against one management endpoint and decodes the
//! replies. One connection is created per discovered server and shared by
//! every component of that server (`Arc<ManagementConnection>`); all methods
//! take `&self` and are safe to call concurrently.
//!
//! Failure semantics: nothing here retries, and nothing here returns `Err`
//! for a failed request. Transport, protocol and decode failures all come
//! back as a failed [`OpResult`] whose description carries the cause.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ConnectionSettings;
use crate::error::Result;
use crate::mgmt::address::Address;
use crate::mgmt::operation::Operation;
use crate::mgmt::result::{self, ComplexResult, OpResult, Reply};
use crate::mgmt::transport::{HttpTransport, MgmtTransport};
use crate::stats::RequestStats;

pub struct ManagementConnection {
    transport: Arc<dyn MgmtTransport>,
    stats: Arc<RequestStats>,
    endpoint: String,
    verbose: bool,
}

impl ManagementConnection {
    /// Connect over HTTP using `settings`
    ///
    /// No request is sent here; an unreachable endpoint shows up as failed
    /// results later.
    pub fn new(settings: &ConnectionSettings, stats: Arc<RequestStats>) -> Result<Self> {
        let transport = HttpTransport::new(settings)?;
        let endpoint = transport.url().to_string();
        Ok(Self {
            transport: Arc::new(transport),
            stats,
            endpoint,
            verbose: settings.verbose,
        })
    }

    /// Use a caller-provided transport
    pub fn with_transport(transport: Arc<dyn MgmtTransport>, stats: Arc<RequestStats>) -> Self {
        Self {
            transport,
            stats,
            endpoint: "custom transport".to_string(),
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stats(&self) -> &Arc<RequestStats> {
        &self.stats
    }

    /// Send `op` and return the raw reply, updating the statistics whether
    /// or not the request succeeded
    async fn round_trip(&self, op: &Operation) -> Result<Value> {
        let body = serde_json::to_value(op)?;
        if self.verbose {
            tracing::debug!("-> {} {}", self.endpoint, body);
        }

        let start = Instant::now();
        let reply = self.transport.post(body).await;
        self.stats.increment_request_count();
        self.stats
            .add_request_time(start.elapsed().as_millis().try_into().unwrap_or(u64::MAX));

        match &reply {
            Ok(json) if self.verbose => tracing::debug!("<- {}", json),
            Err(e) => tracing::warn!(
                "Operation [{}] at [{}] failed on {}: {}",
                op.name(),
                op.address(),
                self.endpoint,
                e
            ),
            _ => {}
        }
        reply
    }

    /// Execute `op` and decode a simple reply
    pub async fn execute(&self, op: &Operation) -> OpResult {
        match self.round_trip(op).await {
            Ok(reply) => OpResult::from_json(&reply),
            Err(e) => OpResult::failure(e.to_string()),
        }
    }

    /// Execute `op` and return the undecoded reply
    ///
    /// Failures before a reply arrived are returned as a synthesized
    /// `{"outcome":"failed", ...}` envelope, so [`Self::is_error_reply`]
    /// works on every value this returns.
    pub async fn execute_raw(&self, op: &Operation) -> Value {
        match self.round_trip(op).await {
            Ok(reply) => reply,
            Err(e) => result::failure_reply(&e.to_string()),
        }
    }

    /// Execute a composite `op`, keeping per-step outcomes
    pub async fn execute_complex(&self, op: &Operation) -> ComplexResult {
        match self.round_trip(op).await {
            Ok(reply) => ComplexResult::from_json(&reply),
            Err(e) => ComplexResult::failure(e.to_string()),
        }
    }

    /// Execute `op`, decoding as composite when `is_complex` is set
    pub async fn execute_with(&self, op: &Operation, is_complex: bool) -> Reply {
        if is_complex {
            Reply::Complex(self.execute_complex(op).await)
        } else {
            Reply::Simple(self.execute(op).await)
        }
    }

    /// Read one subtree of attributes in a single round trip
    pub async fn get_level_data(&self, address: &Address, include_runtime: bool, recursive: bool) -> Value {
        let op = Operation::read_resource(address.clone(), include_runtime, recursive);
        self.execute_raw(&op).await
    }

    pub fn is_error_reply(reply: &Value) -> bool {
        result::is_error_reply(reply)
    }

    pub fn get_success_description(reply: &Value) -> Option<String> {
        result::get_success_description(reply)
    }

    pub fn get_failure_description(reply: &Value) -> String {
        result::get_failure_description(reply)
    }
}
