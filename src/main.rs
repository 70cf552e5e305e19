mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tessera::config::TesseraConfig;

#[derive(Parser)]
#[command(name = "tessera", version, about = "Learns who you are so AI assistants don't have to ask again")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (transport from config: stdio or http)
    Serve {
        /// Override the configured transport
        #[arg(long)]
        transport: Option<String>,
    },
    /// Run a guided interview in the terminal
    Interview {
        /// Continue an unfinished session instead of starting a new one
        #[arg(long)]
        resume: Option<String>,
    },
    /// Print the context block that would be injected into a prompt
    Context {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List stored identity facts
    Facts {
        #[arg(long)]
        json: bool,
    },
    /// Record something about yourself as a context event
    Note {
        text: String,
        /// Where this came from (default: cli)
        #[arg(long)]
        source: Option<String>,
    },
    /// Check database health and configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TesseraConfig::load()?;

    // stderr keeps stdout clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            server::serve(config).await?;
        }
        Command::Interview { resume } => cli::interview(config, resume.as_deref()).await?,
        Command::Context { json } => cli::context(&config, json).await?,
        Command::Facts { json } => cli::facts(&config, json)?,
        Command::Note { text, source } => cli::note(&config, &text, source)?,
        Command::Doctor => cli::doctor(&config)?,
    }

    Ok(())
}
