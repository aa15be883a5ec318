//! `render` and `content` commands.

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::asset::{AssetType, Attributes};
use crate::config::CassetConfig;
use crate::container::Container;
use crate::freshness::PassCache;

use super::RenderArgs;

/// Build a container from the arguments and print its markup.
pub fn render(args: &RenderArgs, config: &CassetConfig) -> Result<()> {
    let container = render_container(args, config)?;

    let mut out = String::new();
    if !args.script {
        out.push_str(&container.render_styles()?);
    }
    if !args.style {
        out.push_str(&container.render_scripts()?);
    }
    write_stdout(out.as_bytes())
}

fn render_container(args: &RenderArgs, config: &CassetConfig) -> Result<Container> {
    let mut container = Container::new(args.name.clone(), config.container_options());
    for dep in &args.deps {
        container.dependency(dep.clone());
    }
    container
        .add(args.sources.clone(), Attributes::new(), Vec::new())
        .with_context(|| format!("failed to register sources for `{}`", args.name))?;
    container.params(args.params.iter().cloned());
    Ok(container)
}

/// Print processed content for `sources`, as the processing route serves it.
pub fn content(kind: AssetType, name: &str, sources: &[String], config: &CassetConfig) -> Result<()> {
    let mut container = Container::new(name, config.container_options());
    container.add(sources.to_vec(), Attributes::new(), Vec::new())?;
    let content = container.content(kind, &mut PassCache::new())?;
    write_stdout(&content)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    if bytes.last().is_some_and(|&b| b != b'\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
