use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "notekeeper")]
#[command(version, about = "Personal notes with unique slugs, served over HTTP")]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init {
        /// Database file (overrides config)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },

    /// Manage users
    User(UserCommand),

    /// List a user's notes
    List {
        /// Owner of the notes
        username: String,

        /// Database file (overrides config)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP server
    Serve {
        /// Listen address, e.g. 127.0.0.1:8000 (overrides config)
        #[arg(long)]
        addr: Option<String>,

        /// Database file (overrides config)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct UserCommand {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Create a user
    Add {
        username: String,

        /// Password for the new user
        #[arg(long)]
        password: String,

        /// Database file (overrides config)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
}
