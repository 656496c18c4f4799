use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tabrelay", about = "Registration automation service and batch runner")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address (overrides [server].bind)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run the pipeline against one or more URLs, one tab after another
    Run {
        /// Target URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Owner of the sessions and credentials
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Times to repeat the whole URL list
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,

        /// Seconds between repetitions (defaults to [batch].repeat_delay_seconds)
        #[arg(short, long)]
        delay: Option<u64>,

        /// Keep everything in memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Show a user's usage ledger
    Usage {
        #[arg(short, long)]
        user: String,
    },
    /// Mark a user as paid (unlimited runs)
    GrantPremium {
        #[arg(short, long)]
        user: String,

        /// Billing customer id to attach
        #[arg(long)]
        customer: Option<String>,
    },
    /// List a user's saved credentials
    Credentials {
        #[arg(short, long)]
        user: String,

        /// Decrypt and print the password of one credential
        #[arg(long)]
        reveal: Option<uuid::Uuid>,
    },
}
