//! Command-line interface module.

mod args;
pub mod clean;
pub mod render;

pub use args::{Cli, Commands, PipelineArgs, RenderArgs};
