//! Server operating modes and process roles

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::discovery::command_line::CommandLineOption;

/// How a server was started, selecting which boot file describes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerMode {
    Standalone,
    /// Domain-wide configuration (domain.xml)
    Domain,
    /// Host controller configuration (host.xml)
    Host,
}

impl ServerMode {
    pub fn default_config_file(&self) -> &'static str {
        match self {
            ServerMode::Standalone => "standalone.xml",
            ServerMode::Domain => "domain.xml",
            ServerMode::Host => "host.xml",
        }
    }

    /// Base directory relative to the installation root
    pub fn default_base_dir(&self) -> &'static str {
        match self {
            ServerMode::Standalone => "standalone",
            ServerMode::Domain | ServerMode::Host => "domain",
        }
    }

    pub fn base_dir_property(&self) -> &'static str {
        match self {
            ServerMode::Standalone => "jboss.server.base.dir",
            ServerMode::Domain | ServerMode::Host => "jboss.domain.base.dir",
        }
    }

    pub fn config_dir_property(&self) -> &'static str {
        match self {
            ServerMode::Standalone => "jboss.server.config.dir",
            ServerMode::Domain | ServerMode::Host => "jboss.domain.config.dir",
        }
    }

    /// Server option overriding the config file name
    pub fn config_file_option(&self) -> CommandLineOption {
        match self {
            ServerMode::Standalone => CommandLineOption::short("c").with_long("server-config"),
            ServerMode::Domain => CommandLineOption::short("c").with_long("domain-config"),
            ServerMode::Host => CommandLineOption::long("host-config"),
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerMode::Standalone => "standalone",
            ServerMode::Domain => "domain",
            ServerMode::Host => "host",
        };
        f.write_str(name)
    }
}

/// Role of one process, from the module jboss-modules launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Standalone,
    HostController,
    ProcessController,
    /// Server started and owned by a process controller
    ManagedServer,
}

impl ProcessRole {
    pub fn from_module(module: &str) -> Option<Self> {
        match module {
            "org.jboss.as.standalone" => Some(ProcessRole::Standalone),
            "org.jboss.as.host-controller" => Some(ProcessRole::HostController),
            "org.jboss.as.process-controller" => Some(ProcessRole::ProcessController),
            "org.jboss.as.server" => Some(ProcessRole::ManagedServer),
            _ => None,
        }
    }

    /// Mode whose boot file describes this process's management interface
    pub fn mode(&self) -> Option<ServerMode> {
        match self {
            ProcessRole::Standalone => Some(ServerMode::Standalone),
            ProcessRole::HostController => Some(ServerMode::Host),
            ProcessRole::ProcessController | ProcessRole::ManagedServer => None,
        }
    }
}
