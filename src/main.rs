use anyhow::Context;
use mgmt_probe::discovery::discover_local;
use mgmt_probe::{Address, ConnectionSettings, ManagementConnection, RequestStats};
use std::sync::Arc;

const USAGE: &str = "Usage:
  mgmt-probe discover        list management endpoints of local servers
  mgmt-probe read <path>     print the resource tree at <path> (e.g. subsystem=datasources)";

/// Settings from the JSON file under the config dir if present, else the environment
fn load_settings() -> anyhow::Result<ConnectionSettings> {
    match ConnectionSettings::default_path().filter(|p| p.exists()) {
        Some(path) => ConnectionSettings::load_from_file(&path)
            .with_context(|| format!("Failed to load connection settings from {}", path.display())),
        None => ConnectionSettings::load().context("Failed to load connection settings from environment"),
    }
}

async fn discover() -> anyhow::Result<()> {
    let endpoints = discover_local().await?;
    if endpoints.is_empty() {
        println!("No management endpoints found");
    }
    for endpoint in endpoints {
        println!(
            "{:>7}  {:<10}  {}://{}  {}",
            endpoint.pid,
            endpoint.mode,
            endpoint.management.scheme(),
            endpoint.management,
            endpoint.resource_name
        );
        println!("         config: {}", endpoint.config_file.display());
    }
    Ok(())
}

async fn read(path: &str) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let address = Address::parse(path).with_context(|| format!("Invalid resource path: {}", path))?;

    let stats = Arc::new(RequestStats::new());
    let connection = ManagementConnection::new(&settings, Arc::clone(&stats))?;
    tracing::info!("Reading [{}] from {}", address, connection.endpoint());

    let reply = connection.get_level_data(&address, true, false).await;
    if ManagementConnection::is_error_reply(&reply) {
        anyhow::bail!(
            "Reading [{}] failed: {}",
            address,
            ManagementConnection::get_failure_description(&reply)
        );
    }
    println!("{}", serde_json::to_string_pretty(&reply["result"])?);

    println!();
    println!("requests: {}", stats.request_count());
    println!("request time: {} ms", stats.request_time());
    println!("max time: {} ms", stats.get_max_time());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    if dotenvy::dotenv().is_err() {
        tracing::debug!(".env file not found - using process environment only");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["discover"] => discover().await,
        ["read"] => read("").await,
        ["read", path] => read(path).await,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}
