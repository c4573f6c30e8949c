// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PaySign Node
//!
//! Entry point for the `paysign-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the embedded database and serves
//! the REST API.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : serve the API and metrics endpoints
//! - `keygen` : generate a software P-256 device key
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use paysign_protocol::config::{
    CANONICAL_FORMAT_VERSION, PROTOCOL_VERSION, PUBLIC_KEY_ENCODING, SIGNATURE_ALGORITHM,
    SIGNATURE_ENCODING,
};
use paysign_protocol::crypto::{sha256_hex, DeviceKey, SignatureProvider};
use paysign_protocol::identity::KeyRegistry;
use paysign_protocol::storage::PaySignDb;

use cli::{Commands, PaySignNodeCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PaySignNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens storage and serves the API and metrics endpoints until a shutdown
/// signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format);

    tracing::info!(
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting paysign-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = PaySignDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let registry = KeyRegistry::open(&db).context("failed to open identity registry")?;
    tracing::info!(
        path = %db_path.display(),
        transactions = db.transaction_count(),
        identities = registry.len(),
        "database opened"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);

    // --- Application state ---
    let app_state = api::build_state(
        format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        db.clone(),
        registry,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.http_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush().context("failed to flush database")?;
    tracing::info!("paysign-node stopped");
    Ok(())
}

/// Generates a software device key. The public key goes to stdout for
/// registration; the private key goes to `--out` if given, stdout otherwise.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let key = DeviceKey::generate().context("failed to generate device key")?;
    let private_key = key.to_pkcs8_b64().context("failed to encode private key")?;
    let public_key = key.public_key_spki_b64();

    println!("Algorithm   : {}", SIGNATURE_ALGORITHM);
    println!("Public key  : {} [{}]", public_key, PUBLIC_KEY_ENCODING);
    println!("Fingerprint : {}", sha256_hex(public_key.as_bytes()));
    println!("Signatures  : {}", SIGNATURE_ENCODING);

    match args.out {
        Some(path) => {
            write_private_key(&path, &private_key)?;
            println!("Private key : written to {}", path.display());
        }
        None => println!("Private key : {}", private_key),
    }

    Ok(())
}

/// Writes the encoded private key to a new file.
///
/// Refuses to overwrite an existing file. On Unix the file is created with
/// mode 0600, so it is never readable by others.
fn write_private_key(path: &Path, encoded: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create private key file {}", path.display()))?;
    file.write_all(encoded.as_bytes())
        .and_then(|_| file.sync_all())
        .with_context(|| format!("failed to write private key to {}", path.display()))?;
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("paysign-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", PROTOCOL_VERSION);
    println!("canonical    v{}", CANONICAL_FORMAT_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never resolves and the other one still applies.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_file_holds_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.key");
        let key = DeviceKey::generate().unwrap();
        let encoded = key.to_pkcs8_b64().unwrap();

        write_private_key(&path, &encoded).unwrap();

        let restored = DeviceKey::from_pkcs8_b64(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored.public_key_spki_b64(), key.public_key_spki_b64());
    }

    #[cfg(unix)]
    #[test]
    fn private_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.key");
        write_private_key(&path, "secret").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn existing_key_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.key");
        std::fs::write(&path, "keep me").unwrap();

        assert!(write_private_key(&path, "replacement").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}
