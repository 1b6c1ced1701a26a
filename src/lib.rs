// Library interface for mgmt-probe
// This exposes the management client and server discovery so they can be:
// - Used programmatically from Rust code
// - Driven from the mgmt-probe binary
// - Exercised from integration tests

pub mod component;
pub mod config;
pub mod discovery;
pub mod error;
pub mod mgmt;
pub mod services;  // Filesystem and process-table seams for discovery
pub mod stats;

// Re-export commonly used types for convenience
pub use component::{
    Availability, AvailabilityType, Configurable, Measurable, MetricRequest, MetricValue, Operable, ServerComponent,
};
pub use config::ConnectionSettings;
pub use discovery::{EndpointDiscovery, HostPort, ProcessEndpoint, ServerCommandLine, ServerMode, Skip, SkipReason};
pub use error::{ProbeError, Result};
pub use mgmt::{
    Address, ComplexResult, ManagementConnection, OpResult, Operation, UploadConnection, UploadReply,
};
pub use stats::RequestStats;

pub use services::{FileSystem, ProcessInfo, ProcessSource, RealFileSystem, SystemProcessSource};
