//! Minimal HTTP/1.1 value objects for the upgrade handshake.
//!
//! These are plain data holders at the boundary of the session engine; the
//! engine only ever writes one request and reads one response per connection.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;

/// Upper bound on the upgrade response head, including the blank line.
const MAX_RESPONSE_HEAD: usize = 16 * 1024;

const MAX_HEADERS: usize = 64;

/// An HTTP request to upgrade.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl Request {
    /// A request with the given method and request-target, no headers yet.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Request {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A no-body retrieval request, the only kind an upgrade accepts.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Appends a header. Duplicates are kept; reserved upgrade headers are
    /// dropped when the request is rendered.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches a body. Upgrade requests must not carry one; this exists so
    /// the rejection path can be exercised.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request-target.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The caller-supplied headers, in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Whether a body is attached.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// An HTTP response, as parsed from the server's upgrade reply.
#[derive(Debug, Clone)]
pub struct Response {
    code: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl Response {
    /// A response from its parts, with an empty reason phrase.
    pub fn new(code: u16, headers: Vec<(String, String)>) -> Self {
        Response {
            code,
            reason: String::new(),
            headers,
        }
    }

    /// Sets the status line's reason phrase.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// The status code.
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// The reason phrase from the status line, possibly empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The status line tail for error messages: `"101 Switching Protocols"`,
    /// or just the code when the reason phrase is empty.
    pub fn status(&self) -> String {
        if self.reason.is_empty() {
            self.code.to_string()
        } else {
            format!("{} {}", self.code, self.reason)
        }
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers, in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Reads the response head off the raw stream and parses it.
///
/// Reads one byte at a time so that no frame bytes following the blank line
/// are consumed; the handshake head is tiny and read exactly once.
pub(crate) async fn read_response<R>(stream: &mut R) -> Result<Response, Error>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(Error::protocol("upgrade response headers too large"));
        }

        match stream.read(&mut byte).await {
            Ok(0) => {
                return Err(Error::protocol(
                    "connection closed before the handshake completed",
                ));
            }
            Ok(_) => head.push(byte[0]),
            Err(err) => return Err(Error::Io(err)),
        }
    }

    parse_response(&head)
}

fn parse_response(head: &[u8]) -> Result<Response, Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    match response.parse(head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(Error::protocol("truncated upgrade response"));
        }
        Err(err) => {
            return Err(Error::protocol(format!("malformed upgrade response: {err}")));
        }
    }

    let code = response
        .code
        .ok_or_else(|| Error::protocol("upgrade response missing a status code"))?;
    let reason = response.reason.unwrap_or_default().to_owned();

    let headers = response
        .headers
        .iter()
        .map(|h| {
            let value = std::str::from_utf8(h.value)
                .map_err(|_| Error::protocol(format!("header '{}' is not valid UTF-8", h.name)))?;
            Ok((h.name.to_owned(), value.to_owned()))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Response::new(code, headers).with_reason(reason))
}
