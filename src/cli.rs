//! Command-line surface for the gateway orchestrator (spec §6). Mirrors
//! `src/server.py`'s argparse flags as a `clap` derive struct, the way
//! the teacher's `sa-gateway::cli` builds its `Cli`/`Command` types, plus
//! a `token` subcommand supplementing the original's flags with the
//! status/refresh operations `TokenStore` already exposes.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chatgate", about = "Multi-provider chat tool-serving gateway")]
pub struct Cli {
    /// Provider to use (e.g. google_chat).
    #[arg(long)]
    pub provider: Option<String>,

    /// Run the local authentication server instead of serving tools.
    #[arg(long = "local-auth")]
    pub local_auth: bool,

    /// Host to bind the server to.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to run the server on.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// List available providers and exit.
    #[arg(long = "list-providers")]
    pub list_providers: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or force-refresh a provider's stored OAuth credential.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Print whether the provider's stored credential is valid.
    Status {
        #[arg(long)]
        provider: String,
    },
    /// Force a credential refresh, failing if no refresh token is stored.
    Refresh {
        #[arg(long)]
        provider: String,
    },
}
