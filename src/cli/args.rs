//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

use crate::asset::AssetType;
use crate::config::Overrides;

/// casset asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: casset.toml)
    #[arg(short = 'C', long, default_value = "casset.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Register sources and print the markup that serves them
    #[command(visible_alias = "r")]
    Render {
        #[command(flatten)]
        args: RenderArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print the processed content of sources, as the processing route would
    #[command(visible_alias = "c")]
    Content {
        /// Emission unit to process
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        kind: AssetType,

        /// Container name
        #[arg(short, long, default_value = "default")]
        name: String,

        /// Sources or collection names
        #[arg(required = true)]
        sources: Vec<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Serve the processing route over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Remove every artifact from the cache directory
    Clean {
        /// List what would be removed without removing it
        #[arg(long)]
        dry: bool,
    },
}

/// `render` command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Container name
    #[arg(short, long, default_value = "default")]
    pub name: String,

    /// Only render styles
    #[arg(long, conflicts_with = "script")]
    pub style: bool,

    /// Only render scripts
    #[arg(long)]
    pub script: bool,

    /// Sources or collection names
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Container-wide dependency (repeatable)
    #[arg(short, long = "dep", value_name = "SOURCE")]
    pub deps: Vec<String>,

    /// Inline script global as KEY=JSON (repeatable)
    #[arg(short = 'P', long = "param", value_name = "KEY=JSON", value_parser = parse_param)]
    pub params: Vec<(String, serde_json::Value)>,
}

/// Pipeline flags overriding `[pipeline]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Processing route; enables deferred mode
    #[arg(long)]
    pub route: Option<String>,

    /// Combine assets of a type into one artifact
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub combine: Option<bool>,

    /// Minify combined artifacts
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// CDN base URL for artifact links
    #[arg(long, value_hint = clap::ValueHint::Url)]
    pub cdn: Option<String>,

    /// Name sources in artifact names and headers
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub show_refer: Option<bool>,
}

impl Cli {
    /// Config overrides carried by the chosen command.
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides::default();
        let pipeline = match &self.command {
            Commands::Render { pipeline, .. } | Commands::Content { pipeline, .. } => pipeline,
            Commands::Serve {
                interface,
                port,
                pipeline,
            } => {
                overrides.interface = *interface;
                overrides.port = *port;
                pipeline
            }
            Commands::Clean { .. } => return overrides,
        };
        overrides.route.clone_from(&pipeline.route);
        overrides.combine = pipeline.combine;
        overrides.minify = pipeline.minify;
        overrides.cdn.clone_from(&pipeline.cdn);
        overrides.show_refer = pipeline.show_refer;
        overrides
    }
}

fn parse_type(s: &str) -> Result<AssetType, String> {
    s.parse()
}

fn parse_param(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got `{s}`"))?;
    if key.is_empty() {
        return Err("parameter key is empty".into());
    }
    // Bare words are taken as strings: `-P user=alice`.
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.into()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["casset", "clean", "-v", "--dry"]).unwrap();
        assert!(cli.verbose);
        assert!(Cli::try_parse_from(["casset", "-V"]).is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "casset", "render", "--style", "-d", "css/vars.less", "-P", "app.id=3", "-P", "who=alice",
            "--minify", "false", "css/a.css", "css/b.less",
        ])
        .unwrap();
        let Commands::Render { args, pipeline } = &cli.command else {
            panic!("expected render");
        };
        assert!(args.style && !args.script);
        assert_eq!(args.sources, ["css/a.css", "css/b.less"]);
        assert_eq!(args.deps, ["css/vars.less"]);
        assert_eq!(args.params[0], ("app.id".into(), serde_json::json!(3)));
        assert_eq!(args.params[1], ("who".into(), serde_json::json!("alice")));
        assert_eq!(pipeline.minify, Some(false));
        assert_eq!(cli.overrides().minify, Some(false));
    }

    #[test]
    fn test_content_and_serve_args() {
        let cli = Cli::try_parse_from(["casset", "content", "--type", "script", "js/a.js"]).unwrap();
        assert!(matches!(cli.command, Commands::Content { kind: AssetType::Script, .. }));

        let cli = Cli::try_parse_from(["casset", "serve", "-p", "9000", "--route", "casset"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.route.as_deref(), Some("casset"));

        assert!(Cli::try_parse_from(["casset", "content", "--type", "image", "a.png"]).is_err());
    }
}
