use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tabchat", version, about = "Conversational tabular data transformation server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve,

    /// List the audit trail of a session
    History {
        /// The session identifier to inspect
        #[arg(short, long)]
        session: String,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}
