use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::core::AppConfig;

pub mod chat;
pub mod migrate;
pub mod serve;
pub mod tools;

#[derive(Subcommand)]
enum Command {
    /// Create the db schema
    Migrate {},
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Chat with the scheduling assistant
    Chat {
        /// Owner of the calendar
        #[arg(long)]
        to_client: String,
        /// Who is asking
        #[arg(long)]
        from_requester: String,
        /// Forget the previous conversation first
        #[arg(long, action, default_value = "false")]
        reset: bool,
    },
    /// Print the calendar tool schema
    Tools {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Migrate {}) => {
            let config = AppConfig::default();
            migrate::run(&config.db_path).await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat {
            to_client,
            from_requester,
            reset,
        }) => {
            chat::run(&to_client, &from_requester, reset).await?;
        }
        Some(Command::Tools {}) => {
            tools::run()?;
        }
        None => {}
    }

    Ok(())
}
