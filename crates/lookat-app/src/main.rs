// ABOUTME: Main entry point for the lookat shell.
// ABOUTME: Sets up logging and configuration, opens the startup file and runs the command loop.

mod cli;
mod command;
mod helper;
mod shell;

use std::io::{self, BufReader, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use lookat_core::Config;
use lookat_data::DataLibrary;
use lookat_render::TextSurface;
use lookat_session::Session;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use shell::Shell;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with plots
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting lookat");

    let config = load_config(cli.config.as_deref())?;
    tracing::info!(
        grid_flow = config.layout.grid_flow.label(),
        width = config.layout.width,
        height = config.layout.height,
        "Loaded config"
    );

    let helper_settings = config.helper.clone();
    let surface = TextSurface::new(io::stdout(), config.layout.width, config.layout.height);
    let session = Session::new(config, DataLibrary::new(), surface);
    let mut shell = Shell::new(session, io::stdout());

    if !cli.no_helper {
        let dirs = helper::search_dirs(
            &helper_settings,
            std::env::var_os("LOOKAT_PATH"),
            std::env::current_dir().ok(),
        );
        if let Some(path) = helper::discover(&helper_settings.file_name, &dirs) {
            match helper::import(&path) {
                Ok(aliases) => {
                    let count = shell.add_aliases(aliases);
                    tracing::info!(path = %path.display(), count, "Imported helper file");
                }
                Err(e) => eprintln!("Warning: {e}"),
            }
        }
    }

    if let Some(file) = &cli.file {
        shell
            .session_mut()
            .add_file(file)
            .with_context(|| format!("Cannot open {}", file.display()))?;
    }

    match &cli.script {
        Some(script) => {
            let input = std::fs::File::open(script)
                .with_context(|| format!("Cannot read {}", script.display()))?;
            shell.run(BufReader::new(input), false)?;
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            shell.run(stdin.lock(), interactive)?;
        }
    }

    tracing::info!(
        histograms = shell.session().histograms().count(),
        "Exiting lookat"
    );
    Ok(())
}

/// Explicit config path, or the default location. A missing file means defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => {
            Config::load(path).with_context(|| format!("Invalid config {}", path.display()))
        }
        Some(path) => {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Config::default())
        }
        None => Ok(Config::load_or_default()),
    }
}
