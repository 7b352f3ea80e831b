//! Sealbox relay host binary.
//!
//! # Usage
//!
//! ```bash
//! # Default relay identity, commands on stdin
//! sealbox-host
//!
//! # Explicit relay identity and verbose logs
//! sealbox-host --address 0x00000000000000000000000000000000000000ee --log-level debug
//! ```

use clap::Parser;
use sealbox_core::Identity;
use sealbox_host::{Console, ConsoleOutcome, HostConfig, HostError, RelayHost, SystemEnv};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealbox confidential message relay
#[derive(Parser, Debug)]
#[command(name = "sealbox-host")]
#[command(about = "Confidential message relay with an operator console")]
#[command(version)]
struct Args {
    /// Relay identity (hex)
    #[arg(short, long)]
    address: Option<String>,

    /// Buffered notifications per observer
    #[arg(long, default_value = "1024")]
    notification_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn host_config(args: &Args) -> Result<HostConfig, HostError> {
    let mut config = HostConfig {
        notification_capacity: args.notification_capacity,
        ..Default::default()
    };

    if let Some(address) = &args.address {
        let address = Identity::from_hex(address)
            .map_err(|e| HostError::Config(format!("invalid --address: {e}")))?;
        if !address.is_valid() {
            let message = "--address must not be the null identity".to_string();
            return Err(HostError::Config(message));
        }
        config.address = address;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = host_config(&args)?;
    tracing::info!("Sealbox relay starting as {}", config.address);

    let host = RelayHost::from_config(SystemEnv::new(), config)?;

    let mut events = host.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let size = event.encode().map(|bytes| bytes.len()).unwrap_or_default();
                    tracing::info!(record = event.record(), size, "{:?}", event);
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "observer lagged behind notifications");
                },
                Err(RecvError::Closed) => break,
            }
        }
    });

    let console = Console::new(host);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let output = match console.execute(&line).await {
            Ok(ConsoleOutcome::Print(text)) => text,
            Ok(ConsoleOutcome::Quit) => break,
            Err(e) => format!("error: {e}"),
        };
        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    tracing::info!("Sealbox relay stopped");
    Ok(())
}
