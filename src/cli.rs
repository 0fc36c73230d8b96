//! Command-line interface for vuot_vu_mon.

use clap::{Parser, Subcommand};

/// Vượt Vũ Môn - quiz and rewards backend
#[derive(Parser, Debug)]
#[command(name = "vuot_vu_mon")]
#[command(about = "Quiz, star and streak backend for young learners", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Database file, overriding config and DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Create an admin account if the email is not yet registered
    CreateAdmin {
        /// Admin login email
        #[arg(long)]
        email: String,

        /// Admin password
        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long, default_value = "Administrator")]
        full_name: String,
    },
}
