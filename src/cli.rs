// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags with env fallbacks

use crate::api::{DEFAULT_API_BASE, DEFAULT_CONTENT_BASE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "markbox")]
#[command(about = "Convert Markdown files in a Dropbox account to HTML as they change", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override data directory (credential and cursor snapshots)
    #[arg(long, global = true, env = "MARKBOX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Dropbox RPC API base URL
    #[arg(long, global = true, env = "MARKBOX_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Dropbox content API base URL
    #[arg(long, global = true, env = "MARKBOX_CONTENT_BASE", default_value = DEFAULT_CONTENT_BASE)]
    pub content_base: String,

    /// List the whole folder tree instead of the root only
    #[arg(long, global = true)]
    pub recursive: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "MARKBOX_LOG", default_value = "info")]
    pub log: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store an access token for an account and run its initial sync
    Authorize {
        /// Account identity
        account: String,

        /// OAuth access token issued for the account
        #[arg(long, env = "MARKBOX_ACCESS_TOKEN")]
        access_token: String,
    },

    /// Run one sync pass for an account in the foreground
    Sync {
        /// Account identity
        account: String,
    },

    /// Read a webhook body from stdin, verify it, and sync every listed account
    Webhook {
        /// Value of the X-Dropbox-Signature header
        #[arg(long)]
        signature: String,

        /// App secret (overrides MARKBOX_APP_SECRET / APP_SECRET)
        #[arg(long)]
        app_secret: Option<String>,
    },

    /// Print the response for a webhook verification challenge
    Challenge {
        /// Value of the `challenge` query parameter
        challenge: String,
    },

    /// Show stored credential presence and cursor for an account
    Status {
        /// Account identity
        account: String,
    },
}
