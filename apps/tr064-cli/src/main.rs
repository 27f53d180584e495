//! TR-064 CLI - discover a TR-064 device and invoke its actions.
//!
//! Output is JSON on stdout; logs go to stderr.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tr064_core::{ActionInfo, Connector, DescriptionVariant, Device, DeviceMeta};

use crate::config::CliConfig;

/// TR-064 CLI - Query and control TR-064 network appliances.
#[derive(Parser, Debug)]
#[command(name = "tr064-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "TR064_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Device host (overrides config file).
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Device port (overrides config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Root description variant: tr064, igd or pmr (overrides config file).
    #[arg(long)]
    variant: Option<DescriptionVariant>,

    /// Use HTTPS on the device's security port for action calls.
    #[arg(long)]
    tls: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover the device and list its services and actions.
    Services,

    /// Invoke an action and print its output values.
    Call {
        /// Service type, e.g. urn:dslforum-org:service:DeviceInfo:1
        service_type: String,

        /// Action name, e.g. GetInfo
        action: String,

        /// Input arguments.
        #[arg(value_name = "NAME=VALUE")]
        args: Vec<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceSummary<'a> {
    service_type: &'a str,
    control_url: &'a str,
    actions: &'a [ActionInfo],
    state_variables: Vec<&'a str>,
}

#[derive(Serialize)]
struct DeviceSummary<'a> {
    device: &'a DeviceMeta,
    services: Vec<ServiceSummary<'a>>,
}

fn summarize(device: &Device) -> DeviceSummary<'_> {
    DeviceSummary {
        device: device.meta(),
        services: device
            .services()
            .into_iter()
            .map(|s| ServiceSummary {
                service_type: s.service_type(),
                control_url: s.control_url(),
                actions: s.actions_info(),
                state_variables: s.state_variable_names(),
            })
            .collect(),
    }
}

/// Splits `NAME=VALUE` arguments. Values may contain `=`.
fn parse_assignments(args: &[String]) -> Result<Vec<(&str, &str)>> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok((name, value)),
            _ => bail!("Invalid argument '{arg}', expected NAME=VALUE"),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("TR-064 CLI v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if args.tls {
        config.tls = true;
    }

    log::info!(
        "Configuration: host={}, port={}, variant={}",
        config.host,
        config.port,
        config.variant
    );

    let connector =
        Connector::new(config.to_core_config()).context("Failed to create HTTP client")?;
    let device = connector
        .init_device(config.variant)
        .await
        .with_context(|| format!("Failed to discover device at {}", config.host))?;

    if let Some(pem) = config.load_ca()? {
        device.set_ca(Some(pem));
    }
    if config.tls {
        let port = device
            .start_encrypted_communication()
            .await
            .context("Failed to enable encrypted communication")?;
        log::info!("Using HTTPS on port {}", port);
    }

    let output = match args.command {
        Command::Services => serde_json::to_string_pretty(&summarize(&device))?,
        Command::Call {
            service_type,
            action,
            args,
        } => {
            let inputs = parse_assignments(&args)?;
            let values = device
                .call(&service_type, &action, &inputs)
                .await
                .with_context(|| format!("{service_type}#{action} failed"))?;
            serde_json::to_string_pretty(&values)?
        }
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_first_equals() {
        let args = vec!["NewSSID=home".to_string(), "NewKey=a=b".to_string()];
        let parsed = parse_assignments(&args).unwrap();
        assert_eq!(parsed, [("NewSSID", "home"), ("NewKey", "a=b")]);
    }

    #[test]
    fn malformed_assignment_is_rejected() {
        assert!(parse_assignments(&["NewSSID".to_string()]).is_err());
        assert!(parse_assignments(&["=value".to_string()]).is_err());
    }

    #[test]
    fn args_parse_call_command() {
        let args = Args::try_parse_from([
            "tr064-cli",
            "--variant",
            "igd",
            "call",
            "urn:dslforum-org:service:DeviceInfo:1",
            "GetInfo",
        ])
        .unwrap();
        assert_eq!(args.variant, Some(DescriptionVariant::Igd));
        assert!(matches!(args.command, Command::Call { ref action, .. } if action == "GetInfo"));
    }
}
