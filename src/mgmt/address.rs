//! Resource addresses in the management tree
//!
//! An address is an ordered list of `(type, name)` segments, e.g.
//! `subsystem=datasources,data-source=ExampleDS`. The empty address is the
//! management root. On the wire it is a list of single-entry objects:
//!
//! ```json
//! [ { "subsystem": "datasources" }, { "data-source": "ExampleDS" } ]
//! ```

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProbeError, Result};

/// One `(type, name)` step of an [`Address`]
///
/// `kind` is empty only for an unqualified root-level singleton.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub kind: String,
    pub name: String,
}

impl Segment {
    fn path_form(&self) -> String {
        if self.kind.is_empty() {
            self.name.clone()
        } else {
            format!("{}={}", self.kind, self.name)
        }
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.kind, &self.name)?;
        map.end()
    }
}

/// Address of a node in the remote management tree
///
/// Addresses are values: [`Address::add`] returns a new address and leaves
/// the parent untouched, so sibling lookups built from one parent never
/// alias each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    segments: Vec<Segment>,
}

impl Address {
    /// The management root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the path form `type=name,type=name`
    ///
    /// A leading `/` and empty pieces are ignored, so `""` and `"/"` both
    /// give the root. A first piece without `=` is an unqualified root-level
    /// name.
    pub fn parse(path: &str) -> Result<Self> {
        let mut address = Address::root();
        let trimmed = path.trim().trim_start_matches('/');
        for piece in trimmed.split(',').filter(|p| !p.trim().is_empty()) {
            let piece = piece.trim();
            address = match piece.split_once('=') {
                Some((kind, name)) => address.add(kind, name)?,
                None => address.add("", piece)?,
            };
        }
        Ok(address)
    }

    /// Return a copy of this address with one segment appended
    ///
    /// # Errors
    /// - `name` is empty
    /// - `kind` is empty and this is not the root (untyped segments are only
    ///   allowed as the first, root-level step)
    pub fn add(&self, kind: &str, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ProbeError::Usage(format!(
                "address segment '{}' needs a non-empty name",
                kind
            )));
        }
        if kind.is_empty() && !self.is_root() {
            return Err(ProbeError::Usage(format!(
                "untyped segment '{}' is only allowed at the root of an address",
                name
            )));
        }
        let mut next = self.clone();
        next.segments.push(Segment {
            kind: kind.to_string(),
            name: name.to_string(),
        });
        Ok(next)
    }

    /// Return a copy of this address with all of `other`'s segments appended
    pub fn append(&self, other: &Address) -> Self {
        let mut next = self.clone();
        next.segments.extend(other.segments.iter().cloned());
        next
    }

    /// Address of the parent node; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Last segment, if any
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Name of the first segment with the given type
    pub fn value_of(&self, kind: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.name.as_str())
    }

    /// Canonical path form, comma-joined `type=name` pairs
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(Segment::path_form)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.segments.len()))?;
        for segment in &self.segments {
            seq.serialize_element(segment)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_seq(AddressVisitor)
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of single-entry {type: name} objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Address, A::Error> {
        let mut address = Address::root();
        while let Some(SegmentEntry(kind, name)) = seq.next_element()? {
            address = address.add(&kind, &name).map_err(de::Error::custom)?;
        }
        Ok(address)
    }
}

struct SegmentEntry(String, String);

impl<'de> Deserialize<'de> for SegmentEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = SegmentEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a single-entry {type: name} object")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> std::result::Result<SegmentEntry, M::Error> {
                let (kind, name): (String, String) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::custom("empty address segment"))?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("address segment has more than one entry"));
                }
                Ok(SegmentEntry(kind, name))
            }
        }

        deserializer.deserialize_map(EntryVisitor)
    }
}
