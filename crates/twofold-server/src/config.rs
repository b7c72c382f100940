use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Daily questions for two, answered out loud.
#[derive(Debug, Parser)]
#[command(name = "twofold", version)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "TWOFOLD_DB_PATH", default_value = "twofold.db", global = true)]
    pub db_path: PathBuf,

    /// Directory recordings are stored in
    #[arg(long, env = "TWOFOLD_AUDIO_DIR", default_value = "audio_uploads", global = true)]
    pub audio_dir: PathBuf,

    #[arg(long, env = "TWOFOLD_HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    #[arg(long, env = "TWOFOLD_PORT", default_value_t = 9005, global = true)]
    pub port: u16,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create missing tables and seed the default rows, then exit
    InitDb,
    /// Drop all data and rebuild an empty store
    Reset {
        /// Required when the store already holds questions or answers
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serving() {
        let cli = Cli::try_parse_from(["twofold", "--port", "8080"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.addr().unwrap().port(), 8080);
    }

    #[test]
    fn reset_requires_explicit_force() {
        let cli = Cli::try_parse_from(["twofold", "reset"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Reset { force: false })));

        let cli = Cli::try_parse_from(["twofold", "reset", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Reset { force: true })));
    }
}
