//! Registration sources and collection alias expansion.
//!
//! `add` accepts one source, a list, or the name of a configured
//! collection. Collections may list other collections, so expansion runs
//! to a fixed point with an explicit in-progress stack; a name reached
//! again while still expanding is a cycle.

use indexmap::IndexMap;

use crate::error::{PipelineError, Result};

/// What a caller hands to `Container::add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// One source string. Still looked up as a collection name first.
    Single(String),
    /// Several sources, registered in order.
    Many(Vec<Source>),
    /// An explicit collection reference.
    Alias(String),
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl<T: Into<Source>> From<Vec<T>> for Source {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Source> + Clone> From<&[T]> for Source {
    fn from(items: &[T]) -> Self {
        Self::Many(items.iter().cloned().map(Into::into).collect())
    }
}

/// Named aliases, as configured.
pub type Collections = IndexMap<String, Source>;

/// Flatten `source` into concrete source strings, in registration order.
pub fn expand(source: &Source, collections: &Collections) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    expand_into(source, collections, &mut stack, &mut out)?;
    Ok(out)
}

fn expand_into<'a>(
    source: &'a Source,
    collections: &'a Collections,
    stack: &mut Vec<&'a str>,
    out: &mut Vec<String>,
) -> Result<()> {
    match source {
        Source::Many(items) => {
            for item in items {
                expand_into(item, collections, stack, out)?;
            }
        }
        Source::Single(name) | Source::Alias(name) => match collections.get_key_value(name) {
            Some((key, aliased)) => {
                if stack.contains(&key.as_str()) {
                    return Err(PipelineError::AliasCycle(key.clone()));
                }
                stack.push(key);
                expand_into(aliased, collections, stack, out)?;
                stack.pop();
            }
            None => out.push(name.clone()),
        },
    }
    Ok(())
}

/// Absolute `http(s):` or protocol-relative source, linked but never processed.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.starts_with("//")
}
