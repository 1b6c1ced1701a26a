//! Endpoint discovery from running processes
//!
//! For each candidate process:
//!
//! 1. parse the command line and determine the process role from the
//!    launched module
//! 2. locate the installation root and the boot configuration file
//! 3. determine the product flavour from the module directories
//! 4. read the management endpoint from the configuration file
//! 5. for host controllers, keep only the local domain controller
//!
//! Every candidate ends as `Ok(ProcessEndpoint)` or `Err(Skip)`; one bad
//! candidate never stops the scan of the others.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConnectionSettings;
use crate::discovery::command_line::ServerCommandLine;
use crate::discovery::host_config::{HostConfiguration, HostPort};
use crate::discovery::mode::{ProcessRole, ServerMode};
use crate::discovery::product::ProductType;
use crate::error::{ProbeError, Result};
use crate::services::{FileSystem, ProcessInfo, ProcessSource};

const JBOSS_HOME_PROPERTY: &str = "jboss.home.dir";
const JBOSS_HOME_ENV: &str = "JBOSS_HOME";
const CONFIGURATION_DIR: &str = "configuration";

/// A server whose management interface can be connected to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEndpoint {
    pub pid: u32,
    pub mode: ServerMode,
    pub management: HostPort,
    /// Native management interface, when declared
    pub native: Option<HostPort>,
    pub config_file: PathBuf,
    pub home_dir: PathBuf,
    pub base_dir: PathBuf,
    pub product: ProductType,
    pub server_name: Option<String>,
    /// e.g. `EAP Domain Controller (127.0.0.1:9990)`
    pub resource_name: String,
    /// Stable identity of the server: its base directory
    pub resource_key: String,
    pub api_version: String,
}

impl ProcessEndpoint {
    /// Connection settings for this endpoint's management interface
    pub fn connection_settings(&self, user: &str, password: Option<&str>) -> ConnectionSettings {
        ConnectionSettings::from_host_port(&self.management, user, password)
    }
}

/// Why a candidate process produced no endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NotAServer,
    ProcessController,
    /// Lifecycle belongs to the process controller
    ManagedServer { parent_pid: Option<u32> },
    /// Host controller slaved to a domain controller elsewhere
    RemoteDomainController(HostPort),
    /// Discovery error for this one candidate
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAServer => f.write_str("not a server process"),
            SkipReason::ProcessController => f.write_str("process controller has no management interface"),
            SkipReason::ManagedServer { parent_pid: Some(parent) } => {
                write!(f, "managed server, owned by process controller {}", parent)
            }
            SkipReason::ManagedServer { parent_pid: None } => f.write_str("managed server"),
            SkipReason::RemoteDomainController(dc) => {
                write!(f, "host controller of the remote domain controller at {}", dc)
            }
            SkipReason::Failed(cause) => f.write_str(cause),
        }
    }
}

impl From<ProbeError> for SkipReason {
    fn from(err: ProbeError) -> Self {
        SkipReason::Failed(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skip {
    pub pid: u32,
    pub reason: SkipReason,
}

pub type CandidateOutcome = std::result::Result<ProcessEndpoint, Skip>;

/// Resolve `path` against the process's working directory
fn absolutize(path: &str, cwd: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(path);
    match cwd {
        Some(cwd) if path.is_relative() => cwd.join(path),
        _ => path,
    }
}

/// Installation root: `-Djboss.home.dir`, then `JBOSS_HOME`, then the
/// parent of the first jboss-modules module path entry
fn resolve_home(cl: &ServerCommandLine, process: &ProcessInfo) -> Option<PathBuf> {
    let cwd = process.cwd.as_deref();
    if let Some(home) = cl.system_property(JBOSS_HOME_PROPERTY).filter(|h| !h.is_empty()) {
        return Some(absolutize(&home, cwd));
    }
    if let Some(home) = process.env.get(JBOSS_HOME_ENV).filter(|h| !h.is_empty()) {
        return Some(absolutize(home, cwd));
    }
    cl.module_path()
        .and_then(|mp| mp.split(':').find(|entry| !entry.is_empty()))
        .map(|mp| absolutize(mp, cwd))
        .and_then(|mp| mp.parent().map(Path::to_path_buf))
}

/// Base directory and boot configuration file of a server
///
/// The config file option wins; an absolute option value is used as-is.
/// Otherwise the file lives in the config directory property, or in
/// `<base dir>/configuration`.
fn resolve_config_file(
    cl: &ServerCommandLine,
    mode: ServerMode,
    home: &Path,
    cwd: Option<&Path>,
) -> (PathBuf, PathBuf) {
    let base_dir = cl
        .system_property(mode.base_dir_property())
        .filter(|d| !d.is_empty())
        .map(|d| absolutize(&d, cwd))
        .unwrap_or_else(|| home.join(mode.default_base_dir()));
    let config_dir = cl
        .system_property(mode.config_dir_property())
        .filter(|d| !d.is_empty())
        .map(|d| absolutize(&d, cwd))
        .unwrap_or_else(|| base_dir.join(CONFIGURATION_DIR));

    let file_name = cl
        .get_class_option(&mode.config_file_option())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| mode.default_config_file().to_string());
    let file = PathBuf::from(&file_name);
    let config_file = if file.is_absolute() {
        file
    } else {
        config_dir.join(file)
    };
    (base_dir, config_file)
}

fn instance_label(mode: ServerMode, is_domain_controller: bool, server_name: Option<&str>) -> String {
    match mode {
        ServerMode::Host if is_domain_controller => "Domain Controller".to_string(),
        ServerMode::Host | ServerMode::Domain => "Host Controller".to_string(),
        ServerMode::Standalone => server_name.unwrap_or("Standalone Server").to_string(),
    }
}

pub struct EndpointDiscovery {
    fs: Arc<dyn FileSystem>,
}

impl EndpointDiscovery {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Inspect one candidate process
    pub async fn inspect(&self, process: &ProcessInfo) -> CandidateOutcome {
        let skip = |reason: SkipReason| Skip {
            pid: process.pid,
            reason,
        };

        let cl = ServerCommandLine::parse(&process.args);
        let mode = match cl.role() {
            None => return Err(skip(SkipReason::NotAServer)),
            Some(ProcessRole::ProcessController) => return Err(skip(SkipReason::ProcessController)),
            Some(ProcessRole::ManagedServer) => {
                return Err(skip(SkipReason::ManagedServer {
                    parent_pid: process.parent_pid,
                }))
            }
            Some(role) => match role.mode() {
                Some(mode) => mode,
                None => return Err(skip(SkipReason::NotAServer)),
            },
        };

        self.inspect_server(process, &cl, mode).await.map_err(skip)
    }

    async fn inspect_server(
        &self,
        process: &ProcessInfo,
        cl: &ServerCommandLine,
        mode: ServerMode,
    ) -> std::result::Result<ProcessEndpoint, SkipReason> {
        let home = resolve_home(cl, process).ok_or_else(|| {
            SkipReason::Failed("cannot determine the installation directory".to_string())
        })?;
        let (base_dir, config_file) = resolve_config_file(cl, mode, &home, process.cwd.as_deref());

        let text = self.fs.read_to_string(&config_file).await.map_err(|e| {
            SkipReason::Failed(format!("cannot read {}: {}", config_file.display(), e))
        })?;
        let product = ProductType::determine(self.fs.as_ref(), &home).await?;

        let config = HostConfiguration::parse(&text)?;
        let management = config.management_host_port(cl, mode)?;

        let is_domain_controller = if mode == ServerMode::Host {
            let dc = config.domain_controller_host_port(cl)?;
            if !dc.is_local {
                return Err(SkipReason::RemoteDomainController(dc));
            }
            true
        } else {
            false
        };

        let server_name = config.host_name();
        let label = instance_label(mode, is_domain_controller, server_name.as_deref());

        let endpoint = ProcessEndpoint {
            pid: process.pid,
            mode,
            resource_name: format!("{} {} ({})", product.short_name(), label, management),
            resource_key: base_dir.display().to_string(),
            native: config.native_host_port(cl, mode).ok(),
            management,
            config_file,
            home_dir: home,
            base_dir,
            product,
            server_name,
            api_version: config.domain_api_version(),
        };
        tracing::info!(
            "Discovered {} (pid {}, {})",
            endpoint.resource_name,
            endpoint.pid,
            endpoint.config_file.display()
        );
        Ok(endpoint)
    }

    /// Inspect every candidate, keeping each outcome
    pub async fn inspect_all(&self, processes: &[ProcessInfo]) -> Vec<CandidateOutcome> {
        join_all(processes.iter().map(|p| self.inspect(p))).await
    }

    /// Endpoints among `processes`; skipped candidates are logged
    pub async fn discover(&self, processes: &[ProcessInfo]) -> Vec<ProcessEndpoint> {
        self.inspect_all(processes)
            .await
            .into_iter()
            .filter_map(|outcome| match outcome {
                Ok(endpoint) => Some(endpoint),
                Err(Skip {
                    reason: SkipReason::NotAServer,
                    ..
                }) => None,
                Err(Skip { pid, reason }) => {
                    tracing::warn!("Skipping process {}: {}", pid, reason);
                    None
                }
            })
            .collect()
    }

    /// Discover endpoints among the processes `source` lists
    pub async fn scan(&self, source: &dyn ProcessSource) -> Vec<ProcessEndpoint> {
        let processes = source.processes();
        tracing::debug!("Inspecting {} processes", processes.len());
        self.discover(&processes).await
    }
}

impl Default for EndpointDiscovery {
    fn default() -> Self {
        Self::new(Arc::new(crate::services::RealFileSystem))
    }
}

/// Discover endpoints among the local machine's processes
pub async fn discover_local() -> Result<Vec<ProcessEndpoint>> {
    let source = crate::services::SystemProcessSource::new();
    Ok(EndpointDiscovery::default().scan(&source).await)
}
