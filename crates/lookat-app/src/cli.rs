// ABOUTME: Command-line arguments of the lookat binary.
// ABOUTME: Parsed with clap; everything else happens inside the shell.

use std::path::PathBuf;

use clap::Parser;

/// Interactive helper for drawing histograms from tree files
#[derive(Debug, Parser)]
#[command(name = "lookat")]
#[command(author, version, about)]
pub struct Cli {
    /// Data file to open at startup
    pub file: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long, env = "LOOKAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not import lookat_helper.lk
    #[arg(long)]
    pub no_helper: bool,

    /// Run the commands in this file instead of reading stdin
    #[arg(short, long)]
    pub script: Option<PathBuf>,
}

impl Cli {
    /// Default log filter when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_and_verbosity() {
        let cli = Cli::try_parse_from(["lookat", "-vv", "test_input.json"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("test_input.json")));
        assert_eq!(cli.log_level(), "debug");
        assert!(!cli.no_helper);
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::try_parse_from(["lookat", "--no-helper"]).unwrap();
        assert!(cli.file.is_none());
        assert!(cli.no_helper);
        assert_eq!(cli.log_level(), "warn");
    }
}
