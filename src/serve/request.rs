//! Processing route request parsing.
//!
//! ```text
//! GET /{route}/{style|script}?c={container}&files={base64 json}&v={version}
//! ```

use url::form_urlencoded;

use crate::asset::{Asset, AssetType, is_remote};
use crate::container::decode_files;
use crate::error::{PipelineError, Result};

/// A decoded processing route request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub kind: AssetType,
    pub container: String,
    /// Local assets to process, remote entries dropped.
    pub files: Vec<Asset>,
    /// Cache-busting value; carried, never interpreted.
    pub version: Option<String>,
}

/// Parse a request target against `route`.
///
/// `Ok(None)` means the path is not the processing route. A malformed
/// query, payload or type is [`PipelineError::Decode`].
pub fn parse(target: &str, route: &str) -> Result<Option<RouteRequest>> {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let Some(kind) = path
        .trim_start_matches('/')
        .strip_prefix(route.trim_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Ok(None);
    };
    if kind.is_empty() || kind.contains('/') {
        return Ok(None);
    }
    let kind: AssetType = kind.parse().map_err(PipelineError::Decode)?;

    let mut container = None;
    let mut files = None;
    let mut version = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "c" => container = Some(value.into_owned()),
            "files" => files = Some(value.into_owned()),
            "v" => version = Some(value.into_owned()),
            _ => {}
        }
    }

    let container = container.unwrap_or_default();
    let files = files.ok_or_else(|| PipelineError::Decode("missing `files` parameter".into()))?;
    let files = decode_files(&files)?
        .into_iter()
        .filter(|a| !is_remote(&a.source))
        .collect();

    Ok(Some(RouteRequest {
        kind,
        container,
        files,
        version,
    }))
}
