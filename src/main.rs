//! Binary entrypoint for the chatbridge CLI.
//!
//! Commands:
//! - `start [--port <path>]` - run the bridge against the configured backend
//! - `init` - create a starter `config.toml`
//! - `echo [--port <path>] [-b <baud>]` - serial echo harness, no backend
//!
//! See the library crate docs for module-level details: `chatbridge::`.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use chatbridge::backend::HttpBackend;
use chatbridge::bridge::ChatBridge;
use chatbridge::codec::LegacyCodec;
use chatbridge::config::Config;
use chatbridge::logutil::truncate_for_log;
use chatbridge::protocol::{FrameReader, FrameWriter};
use chatbridge::serial;

#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(about = "Serial chat bridge for legacy terminals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge
    Start {
        /// Serial device port (e.g., /dev/ttyUSB0); overrides the config
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Initialize a new bridge configuration
    Init,
    /// Run the serial echo harness: frames are decoded and echoed back
    /// with an "Echo: " prefix, without touching the backend
    Echo {
        /// Serial device port; overrides the config
        #[arg(short, long)]
        port: Option<String>,
        /// Baud rate; overrides the config
        #[arg(short = 'b', long)]
        baud: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { port } => {
            let mut config = pre_config.ok_or_else(|| {
                anyhow!(
                    "Config file {} not found or invalid (run `chatbridge init` first)",
                    cli.config
                )
            })?;
            if let Some(cli_port) = port {
                config.serial.port = cli_port;
            }
            info!("Starting chatbridge v{}", env!("CARGO_PKG_VERSION"));

            let api_key = &config.backend.api_key;
            if api_key.is_empty() || api_key.starts_with("${") {
                return Err(anyhow!(
                    "Backend API key not configured. Set the referenced environment variable or edit {}",
                    cli.config
                ));
            }

            // Transport-open failure is fatal: nothing works without the port.
            let link = serial::open(&config.serial)?;
            let backend = HttpBackend::new(config.backend.clone());
            let mut bridge = ChatBridge::new(link, backend, &config);
            bridge.run().await?;
        }
        Commands::Init => {
            info!("Initializing new bridge configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            info!("Edit it to set your serial port and backend credentials.");
        }
        Commands::Echo { port, baud } => {
            let mut config = pre_config.unwrap_or_else(|| {
                warn!("No config file; using defaults for the echo harness");
                Config::default()
            });
            if let Some(cli_port) = port {
                config.serial.port = cli_port;
            }
            if let Some(cli_baud) = baud {
                config.serial.baud_rate = cli_baud;
            }

            let link = serial::open(&config.serial)?;
            let codec = LegacyCodec::for_label(&config.serial.charset);
            let poll_interval = Duration::from_millis(config.bridge.poll_interval_ms);
            run_echo(link, codec, poll_interval).await?;
        }
    }

    Ok(())
}

/// Diagnostic loop: echo every received frame back with a prefix. Exercises
/// the codec and framing path end to end against a real device.
async fn run_echo(
    link: chatbridge::serial::SharedLink,
    codec: LegacyCodec,
    poll_interval: Duration,
) -> Result<()> {
    let mut reader = FrameReader::new(Arc::clone(&link), codec, poll_interval);
    let writer = FrameWriter::new(link, codec);
    info!("Echo harness ready. Waiting for messages... (Ctrl+C to quit)");

    loop {
        tokio::select! {
            polled = reader.poll_frame() => {
                if let Some(message) = polled? {
                    if message.is_empty() {
                        continue;
                    }
                    info!("Received: {}", truncate_for_log(&message, 50));
                    let response = format!("Echo: {message}");
                    writer.write_frame(&response)?;
                    info!("Sent: {}", truncate_for_log(&response, 50));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

            // If stdout is a terminal, mirror log lines to the console as
            // well as the file; under a supervisor, the file is enough.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
