//! CLI command definitions for the `btask` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! noun (`btask task convert`, `btask library add`).

pub mod grammar;
pub mod library;
pub mod task;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Author and convert robotic task programs.
#[derive(Parser)]
#[command(name = "btask", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert, validate, merge and store task programs.
    Task {
        #[command(subcommand)]
        action: task::TaskCommand,
    },

    /// Manage the object, location and action libraries.
    #[command(alias = "lib")]
    Library {
        #[command(subcommand)]
        action: library::LibraryCommand,
    },

    /// Show the block type registry.
    Grammar,

    /// Print a JSON Schema.
    Schema {
        #[arg(value_enum)]
        which: SchemaKind,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaKind {
    /// One conversational agent turn.
    Turn,
    /// The task program document.
    Program,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_with_globals() {
        let cli = Cli::try_parse_from(["btask", "-vv", "--json", "task", "convert", "in.yaml", "--to", "graph"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        let Commands::Task { action: task::TaskCommand::Convert { file, to } } = cli.command else {
            panic!("expected task convert");
        };
        assert_eq!(file.to_str(), Some("in.yaml"));
        assert_eq!(to, task::ConvertTarget::Graph);
    }

    #[test]
    fn test_parse_library_kind() {
        let cli = Cli::try_parse_from(["btask", "library", "resolve", "objects", "cup"]).unwrap();
        assert!(matches!(cli.command, Commands::Library { .. }));
        assert!(Cli::try_parse_from(["btask", "library", "list", "robots"]).is_err());
    }
}
