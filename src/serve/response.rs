//! HTTP responses.

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::utils::mime::types::PLAIN;

pub fn respond_content(request: Request, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    send(request, 200, content_type, body)
}

pub fn respond_bad_request(request: Request, message: &str) -> Result<()> {
    send(request, 400, PLAIN, format!("400 Bad Request: {message}").into_bytes())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    send(request, 404, PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_error(request: Request, error: &crate::error::PipelineError) -> Result<()> {
    let body = format!("500 Internal Server Error\n\n{error}");
    send(request, 500, PLAIN, body.into_bytes())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// HEAD requests get the headers of the full response and no body.
fn send(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    if request.method() == &Method::Head {
        let response = Response::empty(StatusCode(status))
            .with_header(make_header("Content-Type", content_type));
        request.respond(response)?;
        return Ok(());
    }

    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
