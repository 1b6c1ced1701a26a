// Service layer for dependency injection and testability
//
// Design Decision: Ports and adapters around the operating system
//
// Discovery only talks to the outside world through the traits in
// `traits`: the filesystem holding an installation and the process table
// listing candidate servers. RealFileSystem and SystemProcessSource are
// the production adapters; tests wire in the mockall mocks instead.
//
// Usage Example:
//     // Production code
//     let discovery = EndpointDiscovery::new(Arc::new(RealFileSystem));
//     let endpoints = discovery.scan(&SystemProcessSource::new()).await;
//
//     // Test code
//     let fs = in_memory_filesystem(vec![("/opt/jboss/standalone/configuration/standalone.xml", XML)]);
//     let discovery = EndpointDiscovery::new(Arc::new(fs));

pub mod filesystem;
#[cfg(test)]
pub mod mocks;
pub mod process;
pub mod traits;

// Re-export commonly used types
pub use filesystem::RealFileSystem;
pub use process::SystemProcessSource;
pub use traits::{FileSystem, ProcessInfo, ProcessSource};
