//! Discovery of locally running application servers
//!
//! A server is recognised from its command line, and its management
//! endpoint is read from the boot configuration file the command line
//! points at. See [`endpoint::EndpointDiscovery`].

pub mod command_line;
pub mod endpoint;
pub mod host_config;
pub mod mode;
pub mod product;

pub use command_line::{find_option, CommandLineOption, ServerCommandLine};
pub use endpoint::{discover_local, CandidateOutcome, EndpointDiscovery, ProcessEndpoint, Skip, SkipReason};
pub use host_config::{replace_dollar_expression, HostConfiguration, HostPort};
pub use mode::{ProcessRole, ServerMode};
pub use product::ProductType;
