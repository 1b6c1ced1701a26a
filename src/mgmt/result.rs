//! Decoded replies from the management endpoint
//!
//! Simple reply:
//! ```json
//! { "outcome": "success", "result": true }
//! { "outcome": "failed", "failure-description": "JBAS014807: ...", "rolled-back": true }
//! ```
//!
//! Composite reply, one entry per step keyed `step-N` (1-based):
//! ```json
//! { "outcome": "failed",
//!   "result": { "step-1": { "outcome": "success" },
//!               "step-2": { "outcome": "failed", "failure-description": "..." } } }
//! ```

use serde_json::{json, Map, Value};

pub const OUTCOME: &str = "outcome";
pub const SUCCESS: &str = "success";
pub const FAILED: &str = "failed";
pub const RESULT: &str = "result";
pub const FAILURE_DESCRIPTION: &str = "failure-description";
pub const ROLLED_BACK: &str = "rolled-back";

/// Reply to a single operation
///
/// Failure shape is the same for transport, protocol and decode failures;
/// only the description text tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct OpResult {
    outcome: String,
    result: Option<Value>,
    failure_description: Option<String>,
    rolled_back: bool,
}

impl OpResult {
    /// Decode a reply envelope
    pub fn from_json(reply: &Value) -> Self {
        let outcome = reply
            .get(OUTCOME)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let result = reply.get(RESULT).filter(|v| !v.is_null()).cloned();
        let rolled_back = reply.get(ROLLED_BACK).and_then(Value::as_bool).unwrap_or(false);

        let mut failure_description = reply.get(FAILURE_DESCRIPTION).map(describe);
        if outcome != SUCCESS && failure_description.is_none() {
            failure_description = Some(if outcome.is_empty() {
                "Reply carried no outcome".to_string()
            } else {
                format!("Operation outcome was [{}] without a failure description", outcome)
            });
        }

        Self {
            outcome,
            result,
            failure_description,
            rolled_back,
        }
    }

    /// Failed result with the given description
    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            outcome: FAILED.to_string(),
            result: None,
            failure_description: Some(description.into()),
            rolled_back: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SUCCESS
    }

    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Result payload; `None` when absent or JSON null
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<Value> {
        self.result
    }

    /// Non-`None` whenever [`is_success`](Self::is_success) is false
    pub fn failure_description(&self) -> Option<&str> {
        self.failure_description.as_deref()
    }

    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back
    }
}

/// Failure-descriptions are strings in standalone mode and nested objects
/// in domain mode; both render to one line of text.
fn describe(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Outcome of one step of a composite operation
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// 1-based position in the composite
    pub index: usize,
    pub success: bool,
    pub result: Option<Value>,
    pub failure_description: Option<String>,
}

/// Reply to a composite operation
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexResult {
    envelope: OpResult,
    steps: Vec<StepResult>,
}

impl ComplexResult {
    pub fn from_json(reply: &Value) -> Self {
        let envelope = OpResult::from_json(reply);
        let steps = reply
            .get(RESULT)
            .and_then(Value::as_object)
            .map(decode_steps)
            .unwrap_or_default();
        Self { envelope, steps }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            envelope: OpResult::failure(description),
            steps: Vec::new(),
        }
    }

    /// True iff the envelope and every decoded step succeeded
    pub fn is_success(&self) -> bool {
        self.envelope.is_success() && self.steps.iter().all(|s| s.success)
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.index == index)
    }

    pub fn envelope(&self) -> &OpResult {
        &self.envelope
    }

    /// Envelope description, else the first failing step's
    pub fn failure_description(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.envelope.failure_description().or_else(|| {
            self.steps
                .iter()
                .find(|s| !s.success)
                .and_then(|s| s.failure_description.as_deref())
        })
    }
}

fn decode_steps(result: &Map<String, Value>) -> Vec<StepResult> {
    let mut steps: Vec<StepResult> = result
        .iter()
        .filter_map(|(key, value)| {
            let index = key.strip_prefix("step-")?.parse::<usize>().ok()?;
            let step = OpResult::from_json(value);
            Some(StepResult {
                index,
                success: step.is_success(),
                failure_description: step.failure_description().map(str::to_string),
                result: step.into_result(),
            })
        })
        .collect();
    steps.sort_by_key(|s| s.index);
    steps
}

/// Reply of [`execute_with`](crate::mgmt::ManagementConnection::execute_with),
/// decoded as simple or composite depending on the caller's choice
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(OpResult),
    Complex(ComplexResult),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        match self {
            Reply::Simple(result) => result.is_success(),
            Reply::Complex(result) => result.is_success(),
        }
    }

    pub fn failure_description(&self) -> Option<&str> {
        match self {
            Reply::Simple(result) => result.failure_description(),
            Reply::Complex(result) => result.failure_description(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Reply::Simple(result) => result.result(),
            Reply::Complex(result) => result.envelope().result(),
        }
    }
}

/// True when a raw reply does not report success
pub fn is_error_reply(reply: &Value) -> bool {
    reply.get(OUTCOME).and_then(Value::as_str) != Some(SUCCESS)
}

/// Outcome string of a raw reply, or `None` if absent
pub fn get_success_description(reply: &Value) -> Option<String> {
    reply.get(OUTCOME).and_then(Value::as_str).map(str::to_string)
}

/// Failure text of a raw reply, falling back to a generic message
pub fn get_failure_description(reply: &Value) -> String {
    reply
        .get(FAILURE_DESCRIPTION)
        .map(describe)
        .unwrap_or_else(|| "Unknown failure".to_string())
}

/// Synthesized envelope for failures that happened before the peer replied
pub fn failure_reply(description: &str) -> Value {
    json!({
        "outcome": FAILED,
        "failure-description": description,
        "rolled-back": true,
    })
}
