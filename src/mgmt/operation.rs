//! Operations against the management tree
//!
//! An operation is a named request on one [`Address`] with ordered
//! additional properties. It serializes to the flat wire object the
//! management endpoint expects:
//!
//! ```json
//! { "operation": "read-attribute",
//!   "address": [ { "subsystem": "datasources" } ],
//!   "name": "enabled" }
//! ```
//!
//! Property order is insertion order; re-adding a key keeps its slot and
//! replaces the value.

use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProbeError, Result};
use crate::mgmt::address::Address;

/// Key of the typed wrapper the management API uses for binary hashes
pub const BYTES_VALUE: &str = "BYTES_VALUE";

pub const READ_RESOURCE: &str = "read-resource";
pub const READ_ATTRIBUTE: &str = "read-attribute";
pub const WRITE_ATTRIBUTE: &str = "write-attribute";
pub const READ_CHILDREN_NAMES: &str = "read-children-names";
pub const READ_CHILDREN_RESOURCES: &str = "read-children-resources";
pub const COMPOSITE: &str = "composite";

/// Header fields every request carries; never additional properties
const RESERVED_KEYS: [&str; 2] = ["operation", "address"];

/// Value of an additional operation property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Plain JSON (strings, numbers, booleans, nested objects)
    Json(Value),

    /// Content hash, sent as `{"BYTES_VALUE": "<hash>"}` so the peer treats
    /// it as bytes rather than text
    Bytes(String),

    List(Vec<PropertyValue>),

    /// Ordered key/value pairs
    Map(Vec<(String, PropertyValue)>),

    /// Nested operation (composite steps)
    Operation(Box<Operation>),
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Json(value) => value.serialize(serializer),
            PropertyValue::Bytes(hash) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(BYTES_VALUE, hash)?;
                map.end()
            }
            PropertyValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            PropertyValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            PropertyValue::Operation(op) => op.serialize(serializer),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Json(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Json(Value::String(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Json(Value::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Json(Value::from(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Json(Value::from(value))
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        PropertyValue::List(values.into_iter().map(PropertyValue::from).collect())
    }
}

/// Configuration property as held by callers that edit resource configuration
///
/// Matched exhaustively when converting to the wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProperty {
    /// Unset simple values are sent as JSON null
    Simple(Option<String>),
    List(Vec<ConfigProperty>),
    Map(Vec<(String, ConfigProperty)>),
}

impl ConfigProperty {
    pub fn to_wire(&self) -> PropertyValue {
        match self {
            ConfigProperty::Simple(Some(value)) => PropertyValue::from(value.as_str()),
            ConfigProperty::Simple(None) => PropertyValue::Json(Value::Null),
            ConfigProperty::List(items) => {
                PropertyValue::List(items.iter().map(ConfigProperty::to_wire).collect())
            }
            ConfigProperty::Map(entries) => PropertyValue::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_wire()))
                    .collect(),
            ),
        }
    }
}

impl From<ConfigProperty> for PropertyValue {
    fn from(property: ConfigProperty) -> Self {
        property.to_wire()
    }
}

/// A named request against one address
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    address: Address,
    properties: Vec<(String, PropertyValue)>,
}

impl Operation {
    /// Create an operation
    ///
    /// # Errors
    /// `ProbeError::Usage` when `name` is empty
    pub fn new(name: &str, address: Address) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ProbeError::Usage(
                "operation name must not be empty".to_string(),
            ));
        }
        Ok(Self::named(name, address))
    }

    fn named(name: &str, address: Address) -> Self {
        Self {
            name: name.to_string(),
            address,
            properties: Vec::new(),
        }
    }

    /// `read-resource`, optionally including runtime attributes and children
    pub fn read_resource(address: Address, include_runtime: bool, recursive: bool) -> Self {
        Self::named(READ_RESOURCE, address)
            .with_property("include-runtime", include_runtime)
            .with_property("recursive", recursive)
    }

    pub fn read_attribute(address: Address, attribute: &str) -> Self {
        Self::named(READ_ATTRIBUTE, address).with_property("name", attribute)
    }

    pub fn write_attribute(address: Address, attribute: &str, value: impl Into<PropertyValue>) -> Self {
        Self::named(WRITE_ATTRIBUTE, address)
            .with_property("name", attribute)
            .with_property("value", value)
    }

    pub fn read_children_names(address: Address, child_type: &str) -> Self {
        Self::named(READ_CHILDREN_NAMES, address).with_property("child-type", child_type)
    }

    pub fn read_children_resources(address: Address, child_type: &str) -> Self {
        Self::named(READ_CHILDREN_RESOURCES, address).with_property("child-type", child_type)
    }

    pub fn add(address: Address) -> Self {
        Self::named("add", address)
    }

    pub fn remove(address: Address) -> Self {
        Self::named("remove", address)
    }

    pub fn deploy(address: Address) -> Self {
        Self::named("deploy", address)
    }

    pub fn undeploy(address: Address) -> Self {
        Self::named("undeploy", address)
    }

    /// Composite operation bundling `steps`; executed atomically by the peer
    pub fn composite(steps: Vec<Operation>) -> Self {
        let steps = steps
            .into_iter()
            .map(|step| PropertyValue::Operation(Box::new(step)))
            .collect();
        Self::named(COMPOSITE, Address::root()).with_property("steps", PropertyValue::List(steps))
    }

    /// Set an additional property; last write wins, first position is kept
    ///
    /// The header keys `operation` and `address` are ignored.
    pub fn add_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> &mut Self {
        if RESERVED_KEYS.contains(&key) {
            tracing::warn!("Ignoring reserved property '{}' on operation {}", key, self.name);
            return self;
        }
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key.to_string(), value)),
        }
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.add_property(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn properties(&self) -> &[(String, PropertyValue)] {
        &self.properties
    }

    pub fn is_composite(&self) -> bool {
        self.name == COMPOSITE
    }

    /// Number of steps of a composite operation, 0 otherwise
    pub fn step_count(&self) -> usize {
        match self.property("steps") {
            Some(PropertyValue::List(steps)) if self.is_composite() => steps.len(),
            _ => 0,
        }
    }

    pub fn to_json(&self) -> Value {
        // Serializing these types cannot fail: all keys are strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + 2))?;
        map.serialize_entry("operation", &self.name)?;
        map.serialize_entry("address", &self.address)?;
        for (key, value) in &self.properties {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
