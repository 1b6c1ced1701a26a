//! Management protocol client
//!
//! Leaves first: [`Address`] names a node of the remote management tree,
//! [`Operation`] is a request against it, [`OpResult`] / [`ComplexResult`]
//! decode the reply. [`ManagementConnection`] executes operations over the
//! [`MgmtTransport`] seam; [`UploadConnection`] streams deployment content.

pub mod address;
pub mod connection;
pub mod deployment;
pub mod operation;
pub mod result;
pub mod transport;
pub mod upload;

pub use address::{Address, Segment};
pub use connection::ManagementConnection;
pub use deployment::{DeployTarget, DeploymentReport};
pub use operation::{ConfigProperty, Operation, PropertyValue};
pub use result::{ComplexResult, OpResult, Reply, StepResult};
pub use transport::{ContentStream, ContentTransport, HttpTransport, HttpUploadTransport, MgmtTransport};
pub use upload::{UploadConnection, UploadFailure, UploadReply};
