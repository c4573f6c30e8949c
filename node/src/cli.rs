//! # CLI Interface
//!
//! Defines the command-line argument structure for `paysign-node` using
//! `clap` derive. Supports three subcommands: `run`, `keygen` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use paysign_protocol::config::{DEFAULT_DATA_DIR, DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT};

use crate::logging::LogFormat;

/// PaySign node.
///
/// Serves the offer / sign / verify workflow over HTTP, keeps transactions
/// and registered sender keys in an embedded database, and exposes
/// Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "paysign-node",
    about = "PaySign signed payment offer node",
    version,
    propagate_version = true
)]
pub struct PaySignNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the PaySign node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Run(RunArgs),
    /// Generate a software P-256 device key and print its encodings.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the embedded database.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "PAYSIGN_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "PAYSIGN_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "PAYSIGN_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "PAYSIGN_LOG_FORMAT", default_value = "pretty", value_parser = parse_log_format)]
    pub log_format: LogFormat,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Write the PKCS#8 private key (Base64) to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    Ok(LogFormat::from_str_lossy(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        PaySignNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_come_from_protocol_config() {
        let cli = PaySignNodeCli::try_parse_from(["paysign-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.http_port, DEFAULT_HTTP_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
                assert_eq!(args.log_format, LogFormat::Pretty);
            }
            other => panic!("expected Run, got {:?}", other),
        }
    }

    #[test]
    fn log_format_flag_is_parsed() {
        let cli =
            PaySignNodeCli::try_parse_from(["paysign-node", "run", "--log-format", "JSON"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.log_format, LogFormat::Json),
            other => panic!("expected Run, got {:?}", other),
        }
    }
}
