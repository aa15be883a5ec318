//! casset - compile, combine and minify assets from the command line.

use anyhow::Result;
use clap::{ColorChoice, Parser};

use casset::cli::{self, Cli, Commands};
use casset::config::{CassetConfig, init_config};
use casset::logger::{report_error, set_verbose};
use casset::serve;

fn main() {
    if let Err(e) = run() {
        report_error("casset failed", &format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    set_verbose(cli.verbose);

    let config = init_config(CassetConfig::load(&cli.config, &cli.overrides())?);

    match &cli.command {
        Commands::Render { args, .. } => cli::render::render(args, &config),
        Commands::Content {
            kind, name, sources, ..
        } => cli::render::content(*kind, name, sources, &config),
        Commands::Serve { .. } => serve::serve(),
        Commands::Clean { dry } => cli::clean::clean(&config.paths.cache, *dry).map(|_| ()),
    }
}
