//! Processing route server.
//!
//! Serves deferred containers: each request decodes its asset list, builds
//! a fresh container for the named set and returns the processed content.
//! Every request is its own pass, so no staleness decision outlives it.

mod lifecycle;
mod request;
mod response;
mod state;

pub use request::{RouteRequest, parse};
pub use state::{is_shutdown, setup_shutdown_handler};

use std::sync::Arc;

use anyhow::{Result, bail};
use tiny_http::{Request, Server};

use crate::config::{CassetConfig, cfg};
use crate::container::Container;
use crate::error::PipelineError;
use crate::freshness::PassCache;
use crate::{debug, log};

/// Request worker count.
const WORKERS: usize = 4;

/// Bind the configured interface and serve until Ctrl+C.
pub fn serve() -> Result<()> {
    let config = cfg();
    let Some(route) = config.pipeline.route.clone() else {
        bail!("no processing route configured, set `pipeline.route` or pass --route");
    };

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    state::register_server(Arc::clone(&server));

    log!("serve"; "http://{}/{}/{{style,script}}", addr, route);
    run_request_loop(&server, &route)
}

fn run_request_loop(server: &Server, route: &str) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKERS)
        .build()?;

    for request in server.incoming_requests() {
        let route = route.to_string();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &route) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, route: &str) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let parsed = match parse(request.url(), route) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return response::respond_not_found(request),
        Err(e) => {
            debug!("serve"; "{} rejected: {}", request.url(), e);
            return response::respond_bad_request(request, &e.to_string());
        }
    };

    // Fresh config per request; workers never hold a stale snapshot.
    let config = cfg();
    match content_for(&parsed, &config) {
        Ok(body) => response::respond_content(request, parsed.kind.content_type(), body),
        Err(e) => {
            log!("serve"; "{} `{}`: {}", parsed.kind, parsed.container, e);
            response::respond_error(request, &e)
        }
    }
}

/// Processed content for a decoded request.
pub fn content_for(request: &RouteRequest, config: &CassetConfig) -> Result<Vec<u8>, PipelineError> {
    let mut container = Container::new(request.container.clone(), config.container_options());
    for asset in &request.files {
        container.register(asset.clone());
    }
    container.content(request.kind, &mut PassCache::new())
}
