mod invoke;
mod terminal_output;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use fnrelay_config::FunctionsConfig;
use fnrelay_functions::build_registry;
use fnrelay_gateway::{start_server, GatewayState};

#[derive(Parser)]
#[command(name = "fnrelay")]
#[command(about = "fnrelay: serverless glue functions behind one gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway hosting every configured function
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one function once and print its response
    Invoke {
        /// Function name, e.g. upload_media
        function: String,
        #[arg(short = 'X', long, default_value = "POST")]
        method: String,
        /// Path relative to the function root
        #[arg(long, default_value = "/")]
        path: String,
        /// Request header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = invoke::parse_header)]
        headers: Vec<(String, String)>,
        /// File whose bytes become the request body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Query a running gateway's health endpoint
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FunctionsConfig::from_env().context("Failed to read configuration")?;

    let _log_guard = logging::init_logger(&config.log);
    let report = fnrelay_config::check(&config);
    let snapshot = serde_json::to_value(&config)?;
    info!(config = %fnrelay_config::redact(&snapshot), "Configuration loaded");
    debug!(
        fields = ?fnrelay_config::collect_redacted_paths(&snapshot),
        "Redacted configuration fields"
    );
    if !report.is_valid() {
        anyhow::bail!("Configuration has {} error(s)", report.errors.len());
    }

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", config.server.bind_address, port)
                .parse()
                .context("Invalid bind address")?;
            let registry = build_registry(&config);
            info!(%addr, functions = registry.len(), "Starting fnrelay gateway");
            start_server(addr, GatewayState::new(registry)).await?;
        }
        Commands::Invoke {
            function,
            method,
            path,
            headers,
            body_file,
        } => {
            let registry = build_registry(&config);
            let request = invoke::build_request(&method, &path, headers, body_file.as_deref()).await?;
            let response = invoke::run(&registry, &function, request).await?;
            terminal_output::print_response(&response);
        }
        Commands::Status => {
            let url = format!("http://localhost:{}/api/health", config.server.port);
            match reqwest::get(&url).await {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => terminal_output::note_warn(&format!(
                    "fnrelay is not running on port {}",
                    config.server.port
                )),
            }
        }
    }

    Ok(())
}
