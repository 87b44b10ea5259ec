//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod grade;
mod init;
mod serve;
mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Answer-sheet extraction and evaluation against a knowledge base")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true, env = "GRADEBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the web server
    Serve {
        /// Address to bind: PORT, HOST, or HOST:PORT
        #[arg(default_value = "127.0.0.1:5000")]
        bind: String,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Extract and evaluate answer sheets without the web interface
    Grade {
        /// Knowledge base PDF
        knowledge_base: PathBuf,
        /// Answer sheet PDFs or images, in order
        #[arg(required = true)]
        answers: Vec<PathBuf>,
        /// Only extract text, skip evaluation
        #[arg(long)]
        extract_only: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account
    Add {
        /// Email address
        email: String,
        /// Password
        #[arg(long, short)]
        password: String,
        /// Grant admin rights regardless of the configured admin email
        #[arg(long)]
        admin: bool,
    },
    /// List accounts
    List,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
    };
    let settings = load_settings(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::User { command } => match command {
            UserCommands::Add {
                email,
                password,
                admin,
            } => user::cmd_user_add(&settings, &email, &password, admin).await,
            UserCommands::List => user::cmd_user_list(&settings).await,
        },
        Commands::Grade {
            knowledge_base,
            answers,
            extract_only,
        } => grade::cmd_grade(&settings, &knowledge_base, &answers, extract_only).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grade() {
        let cli = Cli::try_parse_from([
            "gradebook",
            "grade",
            "kb.pdf",
            "a.pdf",
            "b.jpg",
            "--extract-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Grade {
                knowledge_base,
                answers,
                extract_only,
            } => {
                assert_eq!(knowledge_base, PathBuf::from("kb.pdf"));
                assert_eq!(answers.len(), 2);
                assert!(extract_only);
            }
            _ => panic!("expected grade command"),
        }

        assert!(Cli::try_parse_from(["gradebook", "grade", "kb.pdf"]).is_err());
    }

    #[test]
    fn test_parse_user_add() {
        let cli = Cli::try_parse_from([
            "gradebook",
            "user",
            "add",
            "a@example.com",
            "--password",
            "pw",
            "--admin",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::User {
                command: UserCommands::Add { admin: true, .. }
            }
        ));
    }
}
