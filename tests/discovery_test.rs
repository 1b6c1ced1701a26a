// Endpoint discovery against fake installations laid out in a TempDir

use mgmt_probe::discovery::{EndpointDiscovery, ProductType, ServerMode, SkipReason};
use mgmt_probe::{ProcessInfo, RealFileSystem};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const STANDALONE_XML: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<server xmlns="urn:jboss:domain:1.4">
    <management>
        <management-interfaces>
            <native-interface security-realm="ManagementRealm">
                <socket-binding native="management-native"/>
            </native-interface>
            <http-interface security-realm="ManagementRealm">
                <socket-binding http="management-http"/>
            </http-interface>
        </management-interfaces>
    </management>
    <interfaces>
        <interface name="management">
            <inet-address value="${jboss.bind.address.management:127.0.0.1}"/>
        </interface>
    </interfaces>
    <socket-binding-group name="standard-sockets" default-interface="public" port-offset="${jboss.socket.binding.port-offset:0}">
        <socket-binding name="management-native" interface="management" port="${jboss.management.native.port:9999}"/>
        <socket-binding name="management-http" interface="management" port="${jboss.management.http.port:9990}"/>
    </socket-binding-group>
</server>"#;

const HOST_XML_LOCAL: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<host name="master" xmlns="urn:jboss:domain:1.4">
    <management>
        <management-interfaces>
            <native-interface security-realm="ManagementRealm">
                <socket interface="management" port="${jboss.management.native.port:9999}"/>
            </native-interface>
            <http-interface security-realm="ManagementRealm">
                <socket interface="management" port="${jboss.management.http.port:9990}"/>
            </http-interface>
        </management-interfaces>
    </management>
    <domain-controller>
        <local/>
    </domain-controller>
    <interfaces>
        <interface name="management">
            <inet-address value="${jboss.bind.address.management:127.0.0.1}"/>
        </interface>
    </interfaces>
</host>"#;

const HOST_XML_SLAVE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<host name="slave" xmlns="urn:jboss:domain:1.4">
    <management>
        <management-interfaces>
            <native-interface security-realm="ManagementRealm">
                <socket interface="management" port="9999"/>
            </native-interface>
            <http-interface security-realm="ManagementRealm">
                <socket interface="management" port="9990"/>
            </http-interface>
        </management-interfaces>
    </management>
    <domain-controller>
        <remote host="${jboss.domain.master.address}" port="${jboss.domain.master.port:9999}"/>
    </domain-controller>
    <interfaces>
        <interface name="management">
            <inet-address value="127.0.0.2"/>
        </interface>
    </interfaces>
</host>"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A server installation with the given product slots
fn install(products: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let home = dir.path();
    write(home, "jboss-modules.jar", "");
    write(home, "standalone/configuration/standalone.xml", STANDALONE_XML);
    write(home, "domain/configuration/host.xml", HOST_XML_LOCAL);
    write(home, "domain/configuration/host-slave.xml", HOST_XML_SLAVE);
    write(
        home,
        "modules/system/layers/base/org/jboss/as/product/main/module.xml",
        "<module/>",
    );
    for product in products {
        write(
            home,
            &format!("modules/system/layers/base/org/jboss/as/product/{}/module.xml", product),
            "<module/>",
        );
    }
    dir
}

fn process(pid: u32, home: &Path, module: &str, server_args: &[&str]) -> ProcessInfo {
    let home = home.display().to_string();
    let mut args = vec![
        "/usr/lib/jvm/java/bin/java".to_string(),
        "-D[Standalone]".to_string(),
        "-Xms64m".to_string(),
        format!("-Dorg.jboss.boot.log.file={}/standalone/log/boot.log", home),
        "-jar".to_string(),
        format!("{}/jboss-modules.jar", home),
        "-mp".to_string(),
        format!("{}/modules", home),
        "-jaxpmodule".to_string(),
        "javax.xml.jaxp-provider".to_string(),
        module.to_string(),
        format!("-Djboss.home.dir={}", home),
    ];
    args.extend(server_args.iter().map(|a| a.to_string()));
    ProcessInfo {
        pid,
        args,
        ..ProcessInfo::default()
    }
}

fn discovery() -> EndpointDiscovery {
    EndpointDiscovery::new(Arc::new(RealFileSystem))
}

#[tokio::test]
async fn test_standalone_server() {
    let dir = install(&["eap"]);
    let candidate = process(1000, dir.path(), "org.jboss.as.standalone", &[]);

    let endpoint = discovery().inspect(&candidate).await.unwrap();
    assert_eq!(endpoint.mode, ServerMode::Standalone);
    assert_eq!(endpoint.management.host, "127.0.0.1");
    assert_eq!(endpoint.management.port, 9990);
    assert!(!endpoint.management.is_secure);
    assert_eq!(endpoint.native.as_ref().map(|n| n.port), Some(9999));
    assert_eq!(endpoint.product, ProductType::Eap);
    assert_eq!(endpoint.api_version, "1.4");
    assert_eq!(
        endpoint.config_file,
        dir.path().join("standalone/configuration/standalone.xml")
    );
    assert_eq!(endpoint.resource_name, "EAP Standalone Server (127.0.0.1:9990)");
}

#[tokio::test]
async fn test_standalone_port_offset_and_bind_address() {
    let dir = install(&[]);
    let candidate = process(
        1001,
        dir.path(),
        "org.jboss.as.standalone",
        &["-Djboss.socket.binding.port-offset=150", "-bmanagement=10.1.1.5"],
    );

    let endpoint = discovery().inspect(&candidate).await.unwrap();
    assert_eq!(endpoint.product, ProductType::As);
    assert_eq!(endpoint.management.host, "10.1.1.5");
    assert_eq!(endpoint.management.port, 10140);
    assert!(endpoint.management.with_offset);
}

#[tokio::test]
async fn test_local_domain_controller() {
    let dir = install(&["eap"]);
    let candidate = process(2000, dir.path(), "org.jboss.as.host-controller", &[]);

    let endpoint = discovery().inspect(&candidate).await.unwrap();
    assert_eq!(endpoint.mode, ServerMode::Host);
    assert_eq!(endpoint.server_name.as_deref(), Some("master"));
    assert_eq!(endpoint.resource_name, "EAP Domain Controller (127.0.0.1:9990)");
    assert_eq!(endpoint.resource_key, dir.path().join("domain").display().to_string());
}

#[tokio::test]
async fn test_slave_host_controller_is_skipped() {
    let dir = install(&[]);
    let candidate = process(
        2001,
        dir.path(),
        "org.jboss.as.host-controller",
        &["--host-config=host-slave.xml", "--master-address=192.168.0.10"],
    );

    let skip = discovery().inspect(&candidate).await.unwrap_err();
    assert_eq!(skip.pid, 2001);
    match skip.reason {
        SkipReason::RemoteDomainController(dc) => {
            assert_eq!(dc.host, "192.168.0.10");
            assert_eq!(dc.port, 9999);
            assert!(!dc.is_local);
        }
        other => panic!("unexpected skip reason: {}", other),
    }
}

#[tokio::test]
async fn test_two_products_fail_only_that_candidate() {
    let ambiguous = install(&["eap", "edg"]);
    let good = install(&[]);

    let endpoints = discovery()
        .discover(&[
            process(3000, ambiguous.path(), "org.jboss.as.standalone", &[]),
            process(3001, good.path(), "org.jboss.as.standalone", &[]),
            process(3002, good.path(), "org.jboss.as.process-controller", &[]),
        ])
        .await;

    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].pid, 3001);
}

#[tokio::test]
async fn test_missing_config_file_is_skip() {
    let dir = install(&[]);
    let candidate = process(
        4000,
        dir.path(),
        "org.jboss.as.standalone",
        &["--server-config=standalone-ha.xml"],
    );

    let skip = discovery().inspect(&candidate).await.unwrap_err();
    match skip.reason {
        SkipReason::Failed(cause) => assert!(cause.contains("standalone-ha.xml")),
        other => panic!("unexpected skip reason: {}", other),
    }
}

#[tokio::test]
async fn test_port_overflow_skips_only_that_candidate() {
    let dir = install(&[]);
    let overflowing = process(
        5000,
        dir.path(),
        "org.jboss.as.standalone",
        &[
            "-Djboss.management.http.port=9223372036854775807",
            "-Djboss.socket.binding.port-offset=1",
        ],
    );
    let good = process(5001, dir.path(), "org.jboss.as.standalone", &[]);

    let outcomes = discovery().inspect_all(&[overflowing, good]).await;
    assert_eq!(outcomes.len(), 2);
    match &outcomes[0] {
        Err(skip) => match &skip.reason {
            SkipReason::Failed(cause) => assert!(cause.contains("out of range")),
            other => panic!("unexpected skip reason: {}", other),
        },
        Ok(endpoint) => panic!("unexpected endpoint: {:?}", endpoint),
    }
    assert_eq!(outcomes[1].as_ref().unwrap().pid, 5001);
}

#[tokio::test]
async fn test_secure_endpoint_connects_over_https() {
    let dir = install(&[]);
    let secure_xml = STANDALONE_XML
        .replace(r#"<socket-binding http="management-http"/>"#, r#"<socket-binding https="management-https"/>"#)
        .replace(
            r#"<socket-binding name="management-http" interface="management" port="${jboss.management.http.port:9990}"/>"#,
            r#"<socket-binding name="management-https" interface="management" port="${jboss.management.https.port:9443}"/>"#,
        );
    write(dir.path(), "standalone/configuration/standalone.xml", &secure_xml);
    let candidate = process(6000, dir.path(), "org.jboss.as.standalone", &[]);

    let endpoint = discovery().inspect(&candidate).await.unwrap();
    assert!(endpoint.management.is_secure);

    let settings = endpoint.connection_settings("admin", None);
    assert_eq!(settings.base_url(), "https://127.0.0.1:9443");
}
