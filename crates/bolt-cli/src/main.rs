//! Bolt command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Join a room on a local gateway
//! bolt --token "$BOLT_TOKEN" --name Ada
//!
//! # Older gateway that only understands bare-string messages
//! bolt --gateway ws://chat.example:8080/ws --token abc --name Ada --legacy-wire
//! ```

use std::{io, time::Duration};

use bolt_cli::{LineDriver, Runtime, stdin_lines};
use bolt_client::{SystemEnv, TransportConfig, transport::DEFAULT_GATEWAY_URL};
use bolt_core::{ReconnectConfig, SessionConfig, WireFormat};
use clap::{Parser, builder::NonEmptyStringValueParser};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Bolt chat client
#[derive(Parser, Debug)]
#[command(name = "bolt")]
#[command(about = "Join an ephemeral Bolt chat room")]
#[command(version)]
struct Args {
    /// Gateway WebSocket URL
    #[arg(short, long, env = "BOLT_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway: String,

    /// Session token issued by the gateway
    #[arg(short, long, env = "BOLT_TOKEN")]
    token: String,

    /// Display name shown to other participants
    #[arg(short, long, default_value = "anonymous", value_parser = NonEmptyStringValueParser::new())]
    name: String,

    /// Send messages as bare strings for gateways without typed payloads
    #[arg(long)]
    legacy_wire: bool,

    /// Give up instead of reconnecting when the connection drops
    #[arg(long)]
    no_reconnect: bool,

    /// Handshake timeout in seconds
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            wire_format: if self.legacy_wire { WireFormat::Legacy } else { WireFormat::Typed },
            reconnect: if self.no_reconnect {
                ReconnectConfig::disabled()
            } else {
                ReconnectConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            gateway_url: self.gateway.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            ..TransportConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries the transcript
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    // Reject an unusable address or token before touching the terminal.
    bolt_client::transport::handshake_request(&args.gateway, &args.token)
        .map_err(bolt_cli::CliError::from)?;

    tracing::info!(gateway = %args.gateway, name = %args.name, "bolt starting");

    let driver = LineDriver::new(args.transport_config(), stdin_lines(), io::stdout());
    let runtime =
        Runtime::new(driver, SystemEnv::new(), args.session_config(), args.name, args.token);

    runtime.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["bolt", "--token", "abc", "--gateway", "ws://gw/ws"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_use_typed_wire_and_reconnect() {
        let args = parse(&[]);
        assert_eq!(args.session_config(), SessionConfig::default());
        assert_eq!(args.name, "anonymous");

        let transport = args.transport_config();
        assert_eq!(transport.gateway_url, "ws://gw/ws");
        assert_eq!(transport.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn flags_select_legacy_wire_and_no_reconnect() {
        let config = parse(&["--legacy-wire", "--no-reconnect", "--name", "Ada"]).session_config();
        assert_eq!(config.wire_format, WireFormat::Legacy);
        assert!(!config.reconnect.enabled);
    }

    #[test]
    fn empty_name_is_rejected() {
        let argv = ["bolt", "--token", "abc", "--name", ""];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
