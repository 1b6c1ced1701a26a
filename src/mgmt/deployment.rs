//! Deployment content install and redeploy
//!
//! Both flows start with a content upload ([`UploadConnection`]) and then
//! reference the returned hash from a management operation:
//!
//! - install: `add` the deployment with `content: [{hash}]`, then `deploy`
//!   (standalone), or `add` at domain level plus server-group `add` +
//!   `deploy` (domain)
//! - redeploy: check the deployment exists, upload, then
//!   `full-replace-deployment` under the same name

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{ProbeError, Result};
use crate::mgmt::address::Address;
use crate::mgmt::connection::ManagementConnection;
use crate::mgmt::operation::{Operation, PropertyValue};
use crate::mgmt::transport::ContentStream;
use crate::mgmt::upload::UploadConnection;

pub const DEPLOYMENT: &str = "deployment";
pub const SERVER_GROUP: &str = "server-group";
pub const FULL_REPLACE_DEPLOYMENT: &str = "full-replace-deployment";

/// Where freshly uploaded content gets installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployTarget {
    /// Standalone server: add and deploy in one composite
    Standalone,
    /// Domain content repository only; not assigned to any server group
    Domain,
    /// Domain content repository plus add + deploy on one server group
    ServerGroup(String),
}

/// What was installed, for the caller's inventory
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentReport {
    /// Path form of the deployment address, e.g. `deployment=app.war`
    pub resource_key: String,
    pub runtime_name: String,
    pub hash: String,
    pub installed_at: DateTime<Utc>,
}

fn content_list(hash: &str) -> PropertyValue {
    PropertyValue::List(vec![PropertyValue::Map(vec![(
        "hash".to_string(),
        PropertyValue::Bytes(hash.to_string()),
    )])])
}

/// `full-replace-deployment` of `name` with previously uploaded content
pub fn full_replace_deployment(name: &str, runtime_name: Option<&str>, hash: &str) -> Result<Operation> {
    let mut op = Operation::new(FULL_REPLACE_DEPLOYMENT, Address::root())?;
    op.add_property("name", name);
    if let Some(runtime_name) = runtime_name {
        op.add_property("runtime-name", runtime_name);
    }
    op.add_property("content", content_list(hash));
    Ok(op)
}

/// Look up the deployment called `name` among the root's deployments
///
/// Returns its resource description, or `None` when no deployment has that
/// name. A failed listing is an error.
pub async fn find_deployment(conn: &ManagementConnection, name: &str) -> Result<Option<Value>> {
    let op = Operation::read_children_resources(Address::root(), DEPLOYMENT);
    let result = conn.execute(&op).await;
    if !result.is_success() {
        return Err(ProbeError::Protocol(format!(
            "cannot list deployments: {}",
            result.failure_description().unwrap_or_default()
        )));
    }

    let found = result
        .result()
        .and_then(Value::as_object)
        .and_then(|deployments| {
            deployments.iter().find_map(|(key, resource)| {
                let resource_name = resource.get("name").and_then(Value::as_str).unwrap_or(key.as_str());
                (resource_name == name).then(|| resource.clone())
            })
        });
    Ok(found)
}

async fn upload_content(upload: &UploadConnection, filename: &str, content: ContentStream) -> Result<String> {
    let reply = upload.upload(filename, content).await;
    match (reply.hash, reply.failure) {
        (Some(hash), None) => Ok(hash),
        (_, Some(failure)) => Err(ProbeError::Protocol(failure.to_string())),
        (None, None) => Err(ProbeError::Protocol("upload returned no content hash".to_string())),
    }
}

/// Replace the content of the existing deployment `name`
///
/// # Errors
/// - the deployment does not exist (nothing is uploaded)
/// - the upload failed
/// - the server rejected the replacement
pub async fn redeploy(
    conn: &ManagementConnection,
    upload: &UploadConnection,
    name: &str,
    content: ContentStream,
    runtime_name: Option<&str>,
) -> Result<DeploymentReport> {
    if find_deployment(conn, name).await?.is_none() {
        return Err(ProbeError::Protocol(format!(
            "deployment [{}] does not exist, nothing to replace",
            name
        )));
    }

    let hash = upload_content(upload, name, content).await?;
    let result = conn
        .execute(&full_replace_deployment(name, runtime_name, &hash)?)
        .await;
    if !result.is_success() {
        return Err(ProbeError::Protocol(format!(
            "failed to replace deployment [{}]: {}",
            name,
            result.failure_description().unwrap_or_default()
        )));
    }

    tracing::info!("Redeployed [{}] with content {}", name, hash);
    Ok(DeploymentReport {
        resource_key: Address::root().add(DEPLOYMENT, name)?.path(),
        runtime_name: runtime_name.unwrap_or(name).to_string(),
        hash,
        installed_at: Utc::now(),
    })
}

/// Operations installing already uploaded content on `target`
pub fn install_operation(
    target: &DeployTarget,
    deployment_name: &str,
    runtime_name: &str,
    hash: &str,
) -> Result<Operation> {
    let deployment = Address::root().add(DEPLOYMENT, deployment_name)?;
    let add = Operation::add(deployment.clone())
        .with_property("runtime-name", runtime_name)
        .with_property("content", content_list(hash));

    let steps = match target {
        DeployTarget::Standalone => vec![add, Operation::deploy(deployment)],
        DeployTarget::Domain => vec![add],
        DeployTarget::ServerGroup(group) => {
            let assigned = Address::root()
                .add(SERVER_GROUP, group)?
                .add(DEPLOYMENT, deployment_name)?;
            vec![
                add,
                Operation::add(assigned.clone()).with_property("runtime-name", runtime_name),
                Operation::deploy(assigned),
            ]
        }
    };
    Ok(Operation::composite(steps))
}

/// Install previously uploaded content as a new deployment
pub async fn deploy_content(
    conn: &ManagementConnection,
    target: &DeployTarget,
    deployment_name: &str,
    runtime_name: Option<&str>,
    hash: &str,
) -> Result<DeploymentReport> {
    let runtime_name = runtime_name.unwrap_or(deployment_name);
    let op = install_operation(target, deployment_name, runtime_name, hash)?;

    let result = conn.execute_complex(&op).await;
    if !result.is_success() {
        return Err(ProbeError::Protocol(format!(
            "failed to deploy [{}]: {}",
            deployment_name,
            result.failure_description().unwrap_or_default()
        )));
    }

    let resource_key = match target {
        DeployTarget::ServerGroup(group) => Address::root()
            .add(SERVER_GROUP, group)?
            .add(DEPLOYMENT, deployment_name)?,
        _ => Address::root().add(DEPLOYMENT, deployment_name)?,
    };
    tracing::info!("Deployed [{}] as {}", deployment_name, resource_key);
    Ok(DeploymentReport {
        resource_key: resource_key.path(),
        runtime_name: runtime_name.to_string(),
        hash: hash.to_string(),
        installed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mgmt::transport::{ContentTransport, MockMgmtTransport};
    use crate::stats::RequestStats;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;

    struct HashingTransport;

    #[async_trait]
    impl ContentTransport for HashingTransport {
        async fn send_content(&self, _filename: &str, mut content: ContentStream) -> Result<Value> {
            let mut sink = Vec::new();
            content.read_to_end(&mut sink).await?;
            Ok(json!({ "outcome": "success", "result": { "BYTES_VALUE": "aGFzaA==" } }))
        }
    }

    /// Connection whose replies depend on the operation name; every request
    /// body is recorded
    fn connection(existing: Value, replace_outcome: &'static str) -> (ManagementConnection, Arc<Mutex<Vec<Value>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&sent);
        let mut mock = MockMgmtTransport::new();
        mock.expect_post().returning(move |body| {
            record.lock().unwrap().push(body.clone());
            Ok(match body["operation"].as_str() {
                Some("read-children-resources") => {
                    json!({ "outcome": "success", "result": existing.clone() })
                }
                _ => json!({ "outcome": replace_outcome, "failure-description": "rejected" }),
            })
        });
        let conn = ManagementConnection::with_transport(Arc::new(mock), Arc::new(RequestStats::new()));
        (conn, sent)
    }

    fn content() -> ContentStream {
        Box::new(std::io::Cursor::new(b"war".to_vec()))
    }

    #[test]
    fn test_full_replace_wire_form() {
        let op = full_replace_deployment("app.war", Some("app"), "aGFzaA==").unwrap();
        assert_eq!(
            op.to_json(),
            json!({
                "operation": "full-replace-deployment",
                "address": [],
                "name": "app.war",
                "runtime-name": "app",
                "content": [{ "hash": { "BYTES_VALUE": "aGFzaA==" } }]
            })
        );
        let op = full_replace_deployment("app.war", None, "h").unwrap();
        assert!(op.property("runtime-name").is_none());
    }

    #[tokio::test]
    async fn test_find_deployment_matches_name() {
        let (conn, _) = connection(
            json!({ "app.war": { "name": "app.war", "enabled": true } }),
            "success",
        );
        assert!(find_deployment(&conn, "app.war").await.unwrap().is_some());
        assert!(find_deployment(&conn, "other.war").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeploy_replaces_existing() {
        let (conn, sent) = connection(json!({ "app.war": { "name": "app.war" } }), "success");
        let upload = UploadConnection::with_transport(Arc::new(HashingTransport));

        let report = redeploy(&conn, &upload, "app.war", content(), None).await.unwrap();
        assert_eq!(report.resource_key, "deployment=app.war");
        assert_eq!(report.runtime_name, "app.war");
        assert_eq!(report.hash, "aGFzaA==");

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["operation"], "full-replace-deployment");
        assert_eq!(sent[1]["content"][0]["hash"]["BYTES_VALUE"], "aGFzaA==");
    }

    #[tokio::test]
    async fn test_redeploy_unknown_deployment_does_not_upload() {
        let (conn, sent) = connection(json!({}), "success");
        let upload = UploadConnection::with_transport(Arc::new(HashingTransport));

        let err = redeploy(&conn, &upload, "app.war", content(), None).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redeploy_rejected_by_server() {
        let (conn, _) = connection(json!({ "app.war": { "name": "app.war" } }), "failed");
        let upload = UploadConnection::with_transport(Arc::new(HashingTransport));

        let err = redeploy(&conn, &upload, "app.war", content(), Some("app")).await.unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_install_operation_per_target() {
        let standalone = install_operation(&DeployTarget::Standalone, "app.war", "app.war", "h").unwrap();
        assert_eq!(standalone.step_count(), 2);
        let json = standalone.to_json();
        assert_eq!(json["steps"][0]["operation"], "add");
        assert_eq!(json["steps"][1]["operation"], "deploy");

        let domain = install_operation(&DeployTarget::Domain, "app.war", "app.war", "h").unwrap();
        assert_eq!(domain.step_count(), 1);

        let group = install_operation(
            &DeployTarget::ServerGroup("main-server-group".into()),
            "app.war",
            "app",
            "h",
        )
        .unwrap();
        let json = group.to_json();
        assert_eq!(group.step_count(), 3);
        assert_eq!(
            json["steps"][2]["address"],
            json!([{ "server-group": "main-server-group" }, { "deployment": "app.war" }])
        );
        assert_eq!(json["steps"][1]["runtime-name"], "app");
    }

    #[tokio::test]
    async fn test_deploy_content_to_server_group() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&sent);
        let mut mock = MockMgmtTransport::new();
        mock.expect_post().times(1).returning(move |body| {
            record.lock().unwrap().push(body);
            Ok(json!({
                "outcome": "success",
                "result": {
                    "step-1": { "outcome": "success" },
                    "step-2": { "outcome": "success" },
                    "step-3": { "outcome": "success" }
                }
            }))
        });
        let conn = ManagementConnection::with_transport(Arc::new(mock), Arc::new(RequestStats::new()));

        let report = deploy_content(
            &conn,
            &DeployTarget::ServerGroup("main-server-group".into()),
            "app.war",
            None,
            "aGFzaA==",
        )
        .await
        .unwrap();
        assert_eq!(report.resource_key, "server-group=main-server-group,deployment=app.war");
        assert_eq!(sent.lock().unwrap()[0]["operation"], "composite");
    }
}
