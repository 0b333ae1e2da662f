use clap::{Parser, Subcommand};

/// todolist: multi-user task list API
#[derive(Parser)]
#[command(name = "todolist", version, about)]
pub struct Cli {
    /// Service name attached to every log line (overrides SERVICE_NAME)
    #[arg(long, global = true)]
    pub service: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true, env = "DEVELOPMENT")]
    pub development: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server (default)
    Serve {
        /// Port to bind (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending database migrations and exit
    Migrate,
}
