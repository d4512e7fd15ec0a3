//! CLI module for Formrag.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Formrag - ask questions about form responses
///
/// Ingest forms with their responses, then get answers grounded in the most
/// relevant responses.
#[derive(Parser, Debug)]
#[command(name = "formrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FORMRAG_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a form from a JSON file: {"name", "fields": [{"name"}], "responses": [{"data"}]}
    Ingest {
        /// Path to the JSON file
        path: String,
    },

    /// Append responses from a JSON file ({"responses": [{"data"}]} or a bare array)
    Append {
        /// Form ID
        form_id: String,

        /// Path to the JSON file
        path: String,
    },

    /// List stored forms
    List,

    /// Ask a question about a form's responses
    Ask {
        /// Form ID
        form_id: String,

        /// The question to ask
        question: String,

        /// Number of responses to use as context (defaults to retrieval.limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file if none exists
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "formrag",
            "-vv",
            "ask",
            "0b7c6a52-7a4a-4c1e-9a51-8d0f1c2d3e4f",
            "What color?",
            "--limit",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { question, limit, .. } => {
                assert_eq!(question, "What color?");
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["formrag", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { host: None, port: None }));
    }
}
