//! Minimal HTTP endpoint serving `/metrics`
//!
//! Only `GET /metrics` is answered; every connection gets one response and is
//! closed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::metrics::DeskMetrics;

/// Largest request head we are willing to buffer
const MAX_REQUEST_LEN: usize = 8 * 1024;

/// How long a client may take to send its request head
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Response to a single request
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn text(status: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

/// Pick the response for a request line such as `GET /metrics HTTP/1.1`
pub fn route(request_line: &str, metrics: &DeskMetrics) -> Response {
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Response::text("400 Bad Request", "bad request\n");
    };

    // Scrapers may append a query string
    let path = target.split('?').next().unwrap_or(target);

    match (method, path) {
        ("GET", "/metrics") => Response {
            status: "200 OK",
            content_type: TEXT_FORMAT,
            body: metrics.render(),
        },
        (_, "/metrics") => Response::text("405 Method Not Allowed", "method not allowed\n"),
        _ => Response::text("404 Not Found", "not found\n"),
    }
}

/// Accept connections forever, answering each on its own task
pub async fn serve(listener: TcpListener, metrics: Arc<DeskMetrics>) -> io::Result<()> {
    serve_with_timeout(listener, metrics, REQUEST_TIMEOUT).await
}

async fn serve_with_timeout(
    listener: TcpListener,
    metrics: Arc<DeskMetrics>,
    request_timeout: Duration,
) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let metrics = Arc::clone(&metrics);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &metrics, request_timeout).await {
                debug!("Connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    metrics: &DeskMetrics,
    request_timeout: Duration,
) -> io::Result<()> {
    let response = match tokio::time::timeout(request_timeout, read_head(&mut stream)).await {
        Ok(Ok(Some(request))) => {
            let head = String::from_utf8_lossy(&request);
            let request_line = head.lines().next().unwrap_or_default();
            route(request_line, metrics)
        }
        Ok(Ok(None)) => {
            warn!("Dropping oversized request (over {} bytes)", MAX_REQUEST_LEN);
            Response::text("431 Request Header Fields Too Large", "too large\n")
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            debug!("No request head within {:?}", request_timeout);
            Response::text("408 Request Timeout", "request timeout\n")
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await
}

/// Read up to the blank line ending the request head; `None` if it grows too large
async fn read_head(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut request = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];

    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);

        if request.len() > MAX_REQUEST_LEN {
            return Ok(None);
        }
    }

    Ok(Some(request))
}
