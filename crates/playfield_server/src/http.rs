//! # HTTP/1.1 Codec
//!
//! Just enough HTTP for a JSON API: one request per connection,
//! `Content-Length` bodies on the server side, and `Content-Length`,
//! chunked or read-to-close bodies when talking to an upstream.
//!
//! ## Wire Layout
//!
//! ```text
//! METHOD SP target SP HTTP/1.1 CRLF
//! (name ":" OWS value CRLF)*
//! CRLF
//! body
//! ```

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ApiError, HttpError, HttpResult};

/// Size limits applied while reading a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Start line plus headers.
    pub max_head: usize,
    /// Body.
    pub max_body: usize,
}

/// Request method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// Anything else, verbatim.
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Other(s) => s,
        }
    }
}

/// A parsed request.
#[derive(Clone, Debug)]
pub struct Request {
    /// Method.
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Headers with lowercase names, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl Request {
    /// Builds a request (used by clients and tests).
    #[must_use]
    pub fn new(method: Method, target: &str, body: Vec<u8>) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// First header value with this (case-insensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Request target: path plus query.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// A response to write (or one read back from an upstream).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Extra headers (lowercase names); length and connection are added on write.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// A JSON response.
    #[must_use]
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                headers: vec![("content-type".into(), "application/json".into())],
                body,
            },
            Err(err) => {
                tracing::error!(%err, "response body failed to encode");
                Self::error(&ApiError::Internal)
            }
        }
    }

    /// The JSON error response for `err`.
    #[must_use]
    pub fn error(err: &ApiError) -> Self {
        let body = format!(r#"{{"error":{}}}"#, json_string(&err.to_string()));
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let ApiError::MethodNotAllowed { allow } = err {
            headers.push(("allow".into(), (*allow).to_string()));
        }
        Self {
            status: err.status(),
            headers,
            body: body.into_bytes(),
        }
    }

    /// First header value with this (case-insensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn split_target(target: &str) -> (String, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    }
}

/// Reason phrase for the status codes this server produces.
#[must_use]
pub fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

// ============================================================================
// READING
// ============================================================================

/// Reads the head: start line and headers. `None` on EOF before any byte.
async fn read_head<R>(
    reader: &mut R,
    max_head: usize,
) -> HttpResult<Option<(String, Vec<(String, String)>)>>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0;
    let mut start_line: Option<String> = None;
    let mut headers = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return if total == 0 {
                Ok(None)
            } else {
                Err(HttpError::UnexpectedEof)
            };
        }
        total += n;
        if total > max_head {
            return Err(HttpError::HeadTooLarge(max_head));
        }

        let text =
            std::str::from_utf8(&line).map_err(|_| HttpError::Malformed("head is not UTF-8"))?;
        let text = text.trim_end_matches(['\r', '\n']);

        match start_line {
            None if text.is_empty() => {}
            None => start_line = Some(text.to_string()),
            Some(_) if text.is_empty() => break,
            Some(_) => {
                let (name, value) = text
                    .split_once(':')
                    .ok_or(HttpError::Malformed("header without colon"))?;
                headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }
    }

    match start_line {
        Some(start) => Ok(Some((start, headers))),
        None => Err(HttpError::Malformed("missing start line")),
    }
}

fn content_length(headers: &[(String, String)]) -> HttpResult<Option<usize>> {
    find_header(headers, "content-length")
        .map(|v| v.parse::<usize>().map_err(|_| HttpError::Malformed("bad content-length")))
        .transpose()
}

async fn read_exact_body<R>(reader: &mut R, len: usize, limit: usize) -> HttpResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    if len > limit {
        return Err(HttpError::BodyTooLarge { size: len, limit });
    }
    let mut body = vec![0; len];
    reader.read_exact(&mut body).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            HttpError::UnexpectedEof
        } else {
            HttpError::Io(err)
        }
    })?;
    Ok(body)
}

/// Reads one request. Returns `None` if the peer closed without sending.
///
/// # Errors
///
/// Returns an [`HttpError`] for oversized, truncated or malformed input.
pub async fn read_request<R>(reader: &mut R, limits: Limits) -> HttpResult<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let Some((start, headers)) = read_head(reader, limits.max_head).await? else {
        return Ok(None);
    };

    let mut parts = start.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed("bad request line"));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed("unsupported HTTP version"));
    }
    if !target.starts_with('/') {
        return Err(HttpError::Malformed("request target must be a path"));
    }
    if find_header(&headers, "transfer-encoding").is_some() {
        return Err(HttpError::Malformed("transfer-encoding is not supported on requests"));
    }

    let body = match content_length(&headers)? {
        Some(len) => read_exact_body(reader, len, limits.max_body).await?,
        None => Vec::new(),
    };

    let (path, query) = split_target(target);
    Ok(Some(Request {
        method: Method::parse(method),
        path,
        query,
        headers,
        body,
    }))
}

/// Reads one response from an upstream.
///
/// # Errors
///
/// Returns an [`HttpError`] for oversized, truncated or malformed input.
pub async fn read_response<R>(reader: &mut R, limits: Limits) -> HttpResult<Response>
where
    R: AsyncBufRead + Unpin,
{
    let Some((start, headers)) = read_head(reader, limits.max_head).await? else {
        return Err(HttpError::UnexpectedEof);
    };

    let mut parts = start.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed("bad status line"));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(HttpError::Malformed("bad status code"))?;

    let chunked = find_header(&headers, "transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let body = if chunked {
        read_chunked(reader, limits.max_body).await?
    } else if let Some(len) = content_length(&headers)? {
        read_exact_body(reader, len, limits.max_body).await?
    } else {
        read_to_close(reader, limits.max_body).await?
    };

    Ok(Response { status, headers, body })
}

async fn read_chunked<R>(reader: &mut R, limit: usize) -> HttpResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(HttpError::UnexpectedEof);
        }
        let size_text = line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| HttpError::Malformed("bad chunk size"))?;
        if size == 0 {
            // Trailers up to the blank line.
            loop {
                line.clear();
                let n = reader.read_line(&mut line).await?;
                if n == 0 || line.trim().is_empty() {
                    return Ok(body);
                }
            }
        }
        if size > limit.saturating_sub(body.len()) {
            return Err(HttpError::BodyTooLarge {
                size: body.len().saturating_add(size),
                limit,
            });
        }
        let chunk = read_exact_body(reader, size, limit).await?;
        body.extend_from_slice(&chunk);
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
    }
}

async fn read_to_close<R>(reader: &mut R, limit: usize) -> HttpResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let read = reader.take(limit as u64 + 1).read_to_end(&mut body).await?;
    if read > limit {
        return Err(HttpError::BodyTooLarge { size: read, limit });
    }
    Ok(body)
}

// ============================================================================
// WRITING
// ============================================================================

/// Writes a response and flushes. Always `Connection: close`.
///
/// # Errors
///
/// Returns [`HttpError::Io`] if the socket fails.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n",
        response.body.len()
    ));
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes a request to an upstream and flushes. Always `Connection: close`.
///
/// # Errors
///
/// Returns [`HttpError::Io`] if the socket fails.
pub async fn write_request<W>(writer: &mut W, host: &str, request: &Request) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!(
        "{} {} HTTP/1.1\r\nhost: {host}\r\n",
        request.method.as_str(),
        request.target()
    );
    for (name, value) in &request.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if !request.body.is_empty() {
        head.push_str(&format!("content-length: {}\r\n", request.body.len()));
    }
    head.push_str("connection: close\r\n\r\n");
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(&request.body).await?;
    writer.flush().await?;
    Ok(())
}
