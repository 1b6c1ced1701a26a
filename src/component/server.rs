//! Generic component for any node of a server's management tree

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{
    Availability, AvailabilityType, ConfigUpdate, Configurable, Measurable, MetricKind, MetricRequest,
    MetricValue, Operable, OperationOutcome, OperationParams,
};
use crate::error::Result;
use crate::mgmt::{Address, ManagementConnection, Operation};

const INTERNAL_PREFIX: &str = "_internal:";
const NO_METRICS: &str = "no metrics available";
const NO_RESULT: &str = "-none provided by the server-";
const ALL_SERVER_GROUPS: &str = "__all";
const SERVER_GROUP: &str = "server-group";

/// A resource at `address`, reached through a shared connection
#[derive(Clone)]
pub struct ServerComponent {
    connection: Arc<ManagementConnection>,
    address: Address,
}

/// Text form of a JSON value; strings lose their quotes
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn param_str<'a>(params: &'a OperationParams, key: &str, default: &'a str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn param_bool(params: &OperationParams, key: &str) -> Option<bool> {
    match params.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl ServerComponent {
    pub fn new(connection: Arc<ManagementConnection>, address: Address) -> Self {
        Self { connection, address }
    }

    /// Component for the node at path form `path`
    pub fn at_path(connection: Arc<ManagementConnection>, path: &str) -> Result<Self> {
        Ok(Self::new(connection, Address::parse(path)?))
    }

    /// Component for a child of this one, sharing the connection
    pub fn child(&self, kind: &str, name: &str) -> Result<Self> {
        Ok(Self::new(Arc::clone(&self.connection), self.address.add(kind, name)?))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn connection(&self) -> &Arc<ManagementConnection> {
        &self.connection
    }

    fn internal_stat(&self, stat: &str) -> f64 {
        let stats = self.connection.stats();
        match stat {
            "mgmtRequests" => stats.request_count() as f64,
            "requestTime" => stats.request_time() as f64,
            "maxTime" => stats.get_max_time() as f64,
            _ => f64::NAN,
        }
    }

    async fn read_metric(&self, request: &MetricRequest) -> Option<MetricValue> {
        let (attribute, sub) = match request.name.split_once(':') {
            Some((attribute, sub)) => (attribute, Some(sub)),
            None => (request.name.as_str(), None),
        };

        let result = self
            .connection
            .execute(&Operation::read_attribute(self.address.clone(), attribute))
            .await;
        if !result.is_success() {
            tracing::warn!(
                "Getting metric [{}] at [{}] failed: {}",
                request.name,
                self.address,
                result.failure_description().unwrap_or_default()
            );
            return None;
        }

        // A null result means the attribute is not implemented
        let value = result.result().filter(|v| !v.is_null())?;

        match request.kind {
            MetricKind::Trait => Some(MetricValue::Trait(value_text(value))),
            MetricKind::Measurement => {
                if value.as_str() == Some(NO_METRICS) {
                    return None;
                }
                let value = match sub {
                    Some(sub) => value.get(sub)?,
                    None => value,
                };
                match value_text(value).parse::<f64>() {
                    Ok(number) => Some(MetricValue::Measurement(number)),
                    Err(_) => {
                        tracing::warn!("Non numeric input for [{}] : [{}]", request.name, value);
                        None
                    }
                }
            }
        }
    }

    async fn server_groups(&self) -> Vec<String> {
        let result = self
            .connection
            .execute(&Operation::read_children_names(Address::root(), SERVER_GROUP))
            .await;
        result
            .result()
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Turn `scope:operation` and its parameters into a request
    async fn build_operation(
        &self,
        scope: &str,
        op: &str,
        params: &OperationParams,
    ) -> std::result::Result<Operation, String> {
        let usage = |e: crate::error::ProbeError| e.to_string();

        match scope {
            "server-group" => {
                let address = Address::root()
                    .add(SERVER_GROUP, param_str(params, "name", ""))
                    .map_err(usage)?;
                let profile = param_str(params, "profile", "default");
                Operation::new(op, address)
                    .map(|o| o.with_property("profile", profile))
                    .map_err(usage)
            }
            "destination" => {
                let kind = param_str(params, "type", "jms-queue").to_lowercase();
                let address = self
                    .address
                    .add(&kind, param_str(params, "name", ""))
                    .map_err(usage)?;
                let entries: Vec<String> = params
                    .get("entries")
                    .and_then(Value::as_array)
                    .map(|list| list.iter().map(value_text).collect())
                    .unwrap_or_default();
                if entries.is_empty() {
                    return Err("No jndi bindings given".to_string());
                }

                let mut operation = Operation::new(op, address).map_err(usage)?;
                operation.add_property("entries", entries);
                if kind == "jms-queue" {
                    if let Some(durable) = param_bool(params, "durable") {
                        operation.add_property("durable", durable);
                    }
                    let selector = param_str(params, "selector", "");
                    if !selector.is_empty() {
                        operation.add_property("selector", selector);
                    }
                }
                Ok(operation)
            }
            "domain" => Operation::new(op, Address::root()).map_err(usage),
            "domain-deployment" if op == "promote" => {
                let deployment = self
                    .address
                    .last()
                    .map(|s| s.name.clone())
                    .ok_or_else(|| "Promote needs a deployment resource".to_string())?;
                let group = param_str(params, SERVER_GROUP, "-not set-");
                let groups = if group == ALL_SERVER_GROUPS {
                    self.server_groups().await
                } else {
                    vec![group.to_string()]
                };
                let enabled = param_bool(params, "enabled").unwrap_or(false);
                tracing::info!("Promoting [{}] to server group(s) {:?}", deployment, groups);

                let steps = groups
                    .iter()
                    .map(|group| -> Result<Operation> {
                        let address = Address::root()
                            .add(SERVER_GROUP, group)?
                            .add("deployment", &deployment)?;
                        Ok(Operation::add(address).with_property("enabled", enabled))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map_err(usage)?;
                Ok(Operation::composite(steps))
            }
            "subsystem" => Operation::new(op, self.address.clone()).map_err(usage),
            _ => Err(format!("No valid operation was given for input [{}:{}]", scope, op)),
        }
    }
}

#[async_trait]
impl Availability for ServerComponent {
    async fn availability(&self) -> AvailabilityType {
        let result = self
            .connection
            .execute(&Operation::read_resource(self.address.clone(), false, false))
            .await;
        if result.is_success() {
            AvailabilityType::Up
        } else {
            AvailabilityType::Down
        }
    }
}

#[async_trait]
impl Measurable for ServerComponent {
    async fn metric_values(&self, requests: &[MetricRequest]) -> Vec<(String, MetricValue)> {
        let mut report = Vec::with_capacity(requests.len());
        for request in requests {
            let value = match request.name.strip_prefix(INTERNAL_PREFIX) {
                Some(stat) => Some(MetricValue::Measurement(self.internal_stat(stat))),
                None => self.read_metric(request).await,
            };
            if let Some(value) = value {
                report.push((request.name.clone(), value));
            }
        }
        report
    }
}

#[async_trait]
impl Operable for ServerComponent {
    async fn invoke_operation(&self, name: &str, params: &OperationParams) -> OperationOutcome {
        let Some((scope, op)) = name.split_once(':') else {
            return Err(format!("Operation with name [{}] did not contain a ':'", name));
        };

        let operation = self.build_operation(scope, op, params).await?;
        let result = self.connection.execute(&operation).await;
        if !result.is_success() {
            return Err(result.failure_description().unwrap_or_default().to_string());
        }
        Ok(result
            .result()
            .filter(|v| !v.is_null())
            .map(value_text)
            .unwrap_or_else(|| NO_RESULT.to_string()))
    }
}

#[async_trait]
impl Configurable for ServerComponent {
    async fn load_configuration(&self) -> std::result::Result<Map<String, Value>, String> {
        let result = self
            .connection
            .execute(&Operation::read_resource(self.address.clone(), false, false))
            .await;
        if !result.is_success() {
            return Err(result.failure_description().unwrap_or_default().to_string());
        }
        match result.into_result() {
            Some(Value::Object(attributes)) => Ok(attributes),
            Some(other) => Err(format!("Unexpected configuration of {}: {}", self.address, other)),
            None => Ok(Map::new()),
        }
    }

    async fn update_configuration(&self, updates: &[ConfigUpdate]) -> OperationOutcome {
        if updates.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let steps = updates
            .iter()
            .map(|(name, value)| Operation::write_attribute(self.address.clone(), name, value.to_wire()))
            .collect();
        let result = self.connection.execute_complex(&Operation::composite(steps)).await;
        if !result.is_success() {
            tracing::warn!("Configuration update of {} failed", self.address);
            return Err(result.failure_description().unwrap_or_default().to_string());
        }
        Ok(format!("Updated {} attribute(s)", updates.len()))
    }
}
