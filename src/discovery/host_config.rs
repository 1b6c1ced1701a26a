//! Boot configuration (standalone.xml / host.xml) inspection
//!
//! Design Decision: Small path selector instead of a full XPath engine
//!
//! The lookups discovery needs are all of the form
//! `//a/b[@name='x']/c/@attr`: absolute or descendant-anywhere paths of
//! element names, optionally filtered by one attribute equality, optionally
//! ending in an attribute. [`HostConfiguration::select`] implements exactly
//! that over a `roxmltree` document. Element names are matched by local
//! name, so the versioned default namespace of each file does not matter.
//!
//! The management interface can be declared three ways:
//!
//! 1. socket-binding style (standalone):
//!    `<http-interface><socket-binding http="management-http"/></http-interface>`
//!    resolved through `/server/socket-binding-group`, which may carry a
//!    `port-offset`
//! 2. socket style (host controllers):
//!    `<http-interface><socket interface="management" port="9990"/></http-interface>`
//! 3. legacy attribute style:
//!    `<http-interface interface="management" port="9990"/>`
//!
//! Values may be `${property:default}` expressions, resolved against the
//! process command line.

use regex::Regex;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::discovery::command_line::{CommandLineOption, ServerCommandLine};
use crate::discovery::mode::ServerMode;
use crate::error::{ProbeError, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_MGMT_PORT: u16 = 9990;
pub const DEFAULT_NATIVE_PORT: u16 = 9999;

const BIND_ADDRESS_MANAGEMENT_PROPERTY: &str = "jboss.bind.address.management";
const DOMAIN_MASTER_ADDRESS_PROPERTY: &str = "jboss.domain.master.address";
const DOMAIN_MASTER_PORT_PROPERTY: &str = "jboss.domain.master.port";
const PORT_OFFSET_PROPERTY: &str = "jboss.socket.binding.port-offset";

/// A management endpoint location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
    /// Endpoint belongs to the inspected process's own host
    pub is_local: bool,
    pub is_secure: bool,
    /// A socket-binding-group port offset was applied
    pub with_offset: bool,
}

impl HostPort {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            is_local: true,
            is_secure: false,
            with_offset: false,
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.is_secure {
            "https"
        } else {
            "http"
        }
    }
}

impl std::fmt::Display for HostPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Which management interface to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interface {
    Http,
    Native,
}

impl Interface {
    fn element(&self) -> &'static str {
        match self {
            Interface::Http => "http-interface",
            Interface::Native => "native-interface",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Interface::Http => DEFAULT_MGMT_PORT,
            Interface::Native => DEFAULT_NATIVE_PORT,
        }
    }
}

struct Step<'s> {
    name: &'s str,
    predicate: Option<(&'s str, &'s str)>,
}

/// Split a path on `/` outside of `[...]`
fn split_steps(path: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in path.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                steps.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    steps.push(&path[start..]);
    steps
}

fn parse_step(step: &str) -> Step<'_> {
    let Some((name, rest)) = step.split_once('[') else {
        return Step {
            name: step,
            predicate: None,
        };
    };
    let predicate = rest
        .trim_end_matches(']')
        .strip_prefix('@')
        .and_then(|p| p.split_once('='))
        .map(|(attr, value)| (attr, value.trim_matches(|c| c == '\'' || c == '"')));
    Step { name, predicate }
}

fn matches(node: &Node<'_, '_>, step: &Step<'_>) -> bool {
    node.is_element()
        && node.tag_name().name() == step.name
        && step
            .predicate
            .map(|(attr, value)| node.attribute(attr) == Some(value))
            .unwrap_or(true)
}

pub struct HostConfiguration<'a> {
    doc: Document<'a>,
}

impl<'a> HostConfiguration<'a> {
    /// # Errors
    /// `ProbeError::Xml` when the text is not well-formed
    pub fn parse(text: &'a str) -> Result<Self> {
        Ok(Self {
            doc: Document::parse(text)?,
        })
    }

    /// Elements matching `path` (`/a/b`, `//a/b`, steps may carry
    /// `[@attr='value']`); a trailing `@attr` step is ignored here
    pub fn select(&self, path: &str) -> Vec<Node<'_, 'a>> {
        let (descendant, rest) = match path.strip_prefix("//") {
            Some(rest) => (true, rest),
            None => (false, path.trim_start_matches('/')),
        };
        let steps: Vec<Step<'_>> = split_steps(rest)
            .into_iter()
            .filter(|s| !s.is_empty() && !s.starts_with('@'))
            .map(parse_step)
            .collect();
        let Some((first, others)) = steps.split_first() else {
            return Vec::new();
        };

        let mut current: Vec<Node<'_, 'a>> = if descendant {
            self.doc.descendants().filter(|n| matches(n, first)).collect()
        } else {
            let root = self.doc.root_element();
            if matches(&root, first) {
                vec![root]
            } else {
                Vec::new()
            }
        };

        for step in others {
            current = current
                .iter()
                .flat_map(|node| node.children().filter(|n| matches(n, step)))
                .collect();
        }
        current
    }

    /// String value of the first match: the trailing `@attr` if the path
    /// has one, else the element text; `""` when nothing matches
    pub fn value_of(&self, path: &str) -> String {
        let attribute = path
            .rsplit_once('/')
            .and_then(|(_, last)| last.strip_prefix('@'));
        self.select(path)
            .first()
            .and_then(|node| match attribute {
                Some(attr) => node.attribute(attr),
                None => node.text(),
            })
            .unwrap_or_default()
            .to_string()
    }

    /// `name` attribute of the root element
    pub fn host_name(&self) -> Option<String> {
        self.doc.root_element().attribute("name").map(str::to_string)
    }

    /// Version suffix of the root element's namespace, e.g. `1.4` for
    /// `urn:jboss:domain:1.4`
    pub fn domain_api_version(&self) -> String {
        self.doc
            .root_element()
            .tag_name()
            .namespace()
            .and_then(|ns| ns.rsplit(':').next())
            .unwrap_or_default()
            .to_string()
    }

    pub fn management_security_realm(&self) -> Option<String> {
        let realm = self.value_of("//management/management-interfaces/http-interface/@security-realm");
        (!realm.is_empty()).then_some(realm)
    }

    /// `vault-option` name/value pairs in document order, `None` without a
    /// vault element
    pub fn vault(&self) -> Option<Vec<(String, String)>> {
        if self.select("//vault").is_empty() {
            return None;
        }
        Some(
            self.select("//vault/vault-option")
                .iter()
                .filter_map(|opt| Some((opt.attribute("name")?.to_string(), opt.attribute("value")?.to_string())))
                .collect(),
        )
    }

    /// HTTP management endpoint
    ///
    /// # Errors
    /// - no http-interface is declared
    /// - port or port offset is not a number
    pub fn management_host_port(&self, cl: &ServerCommandLine, mode: ServerMode) -> Result<HostPort> {
        self.interface_host_port(Interface::Http, cl, mode)
    }

    /// Native management endpoint
    pub fn native_host_port(&self, cl: &ServerCommandLine, mode: ServerMode) -> Result<HostPort> {
        self.interface_host_port(Interface::Native, cl, mode)
    }

    fn interface_address(&self, interface_name: &str, prefix: &str) -> String {
        let inet = self.value_of(&format!(
            "{}interfaces/interface[@name='{}']/inet-address/@value",
            prefix, interface_name
        ));
        if !inet.is_empty() {
            return inet;
        }
        self.value_of(&format!(
            "{}interfaces/interface[@name='{}']/loopback-address/@value",
            prefix, interface_name
        ))
    }

    fn interface_host_port(&self, interface: Interface, cl: &ServerCommandLine, mode: ServerMode) -> Result<HostPort> {
        let base = format!("//management/management-interfaces/{}", interface.element());
        if self.select(&base).is_empty() {
            return Err(ProbeError::Discovery(format!(
                "no management {} declared",
                interface.element()
            )));
        }

        let mut is_secure = false;
        let mut port_offset_raw = String::new();
        let port_string;
        let address;

        if !self.select(&format!("{}/socket-binding", base)).is_empty() {
            let binding = if interface == Interface::Http {
                let https = self.value_of(&format!("{}/socket-binding/@https", base));
                is_secure = !https.is_empty();
                if is_secure {
                    https
                } else {
                    self.value_of(&format!("{}/socket-binding/@http", base))
                }
            } else {
                self.value_of(&format!("{}/socket-binding/@native", base))
            };
            let socket = format!("/server/socket-binding-group/socket-binding[@name='{}']", binding);
            port_string = self.value_of(&format!("{}/@port", socket));
            let interface_name = self.value_of(&format!("{}/@interface", socket));
            port_offset_raw = self.value_of("/server/socket-binding-group/@port-offset");
            address = self.interface_address(&interface_name, "/server/");
        } else if !self.select(&format!("{}/socket", base)).is_empty() {
            let interface_name = self.value_of(&format!("{}/socket/@interface", base));
            address = self.interface_address(&interface_name, "//");
            let secure_port = if interface == Interface::Http {
                self.value_of(&format!("{}/socket/@secure-port", base))
            } else {
                String::new()
            };
            is_secure = !secure_port.is_empty();
            port_string = if is_secure {
                secure_port
            } else {
                self.value_of(&format!("{}/socket/@port", base))
            };
        } else {
            let secure_port = self.value_of(&format!("{}/@secure-port", base));
            is_secure = !secure_port.is_empty();
            port_string = if is_secure {
                secure_port
            } else {
                self.value_of(&format!("{}/@port", base))
            };
            let interface_name = self.value_of(&format!("{}/@interface", base));
            address = self.interface_address(&interface_name, "//");
        }

        let host = if address.is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            replace_dollar_expression(&address, cl, DEFAULT_HOST)
        };

        let default_port = interface.default_port().to_string();
        let mut port: i64 = if port_string.is_empty() {
            interface.default_port().into()
        } else {
            parse_number(&replace_dollar_expression(&port_string, cl, &default_port), "port")?
        };

        let mut with_offset = false;
        if !port_offset_raw.is_empty() {
            let offset = parse_number(&replace_dollar_expression(&port_offset_raw, cl, "0"), "port offset")?;
            port = add_offset(port, offset)?;
            with_offset = true;
        } else if mode == ServerMode::Standalone {
            if let Some(offset) = cl.system_property(PORT_OFFSET_PROPERTY) {
                port = add_offset(port, parse_number(&offset, "port offset")?)?;
            }
        }

        Ok(HostPort {
            host,
            port: u16::try_from(port)
                .map_err(|_| ProbeError::Discovery(format!("port {} is out of range", port)))?,
            is_local: true,
            is_secure,
            with_offset,
        })
    }

    /// Where this host controller's domain controller lives
    ///
    /// Local when host.xml declares no remote domain controller, or when the
    /// declared remote is this host's own management address.
    pub fn domain_controller_host_port(&self, cl: &ServerCommandLine) -> Result<HostPort> {
        let mut remote_host = self.value_of("/host/domain-controller/remote/@host");
        let mut remote_port = self.value_of("/host/domain-controller/remote/@port");
        if remote_host.is_empty() {
            remote_host = self.value_of("/host/domain-controller/@host");
            remote_port = self.value_of("/host/domain-controller/@port");
        }

        let own = self.management_host_port(cl, ServerMode::Host)?;
        if remote_host.is_empty() {
            return Ok(own);
        }

        let host = replace_dollar_expression(&remote_host, cl, "localhost");
        let default_port = DEFAULT_NATIVE_PORT.to_string();
        let port_text = if remote_port.is_empty() {
            default_port.clone()
        } else {
            replace_dollar_expression(&remote_port, cl, &default_port)
        };
        let port = u16::try_from(parse_number(&port_text, "domain controller port")?)
            .map_err(|_| ProbeError::Discovery(format!("domain controller port {} is out of range", port_text)))?;

        let native = self.native_host_port(cl, ServerMode::Host).ok();
        let is_own = |candidate: &HostPort| candidate.host == host && candidate.port == port;
        let is_local = is_own(&own) || native.as_ref().map(is_own).unwrap_or(false);

        Ok(HostPort {
            host,
            port,
            is_local,
            is_secure: false,
            with_offset: false,
        })
    }
}

fn parse_number(text: &str, what: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| ProbeError::Discovery(format!("{} [{}] is not a number", what, text)))
}

fn add_offset(port: i64, offset: i64) -> Result<i64> {
    port.checked_add(offset)
        .ok_or_else(|| ProbeError::Discovery(format!("port {} with offset {} is out of range", port, offset)))
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$\{([^:}]+)(?::([^}]*))?\}$").expect("Invalid expression pattern")
    })
}

/// Resolve a `${name}` / `${name:default}` expression
///
/// Lookup order: the dedicated server option for the management bind
/// address and master address/port, then `-D` system properties, then the
/// expression's default, then `last_resort`. Other values are returned
/// unchanged.
pub fn replace_dollar_expression(value: &str, cl: &ServerCommandLine, last_resort: &str) -> String {
    let Some(captures) = expression_pattern().captures(value.trim()) else {
        return value.to_string();
    };
    let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let fallback = captures
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or(last_resort);

    let option = match name {
        BIND_ADDRESS_MANAGEMENT_PROPERTY => Some(CommandLineOption::short("bmanagement")),
        DOMAIN_MASTER_ADDRESS_PROPERTY => Some(CommandLineOption::long("master-address")),
        DOMAIN_MASTER_PORT_PROPERTY => Some(CommandLineOption::long("master-port")),
        _ => None,
    };

    option
        .and_then(|option| cl.get_class_option(&option))
        .or_else(|| cl.system_property(name))
        .unwrap_or_else(|| fallback.to_string())
}
