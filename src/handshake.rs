//! Opening-handshake key negotiation and upgrade-response validation.

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{
    error::Error,
    http::{Request, Response, read_response},
};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Headers the negotiator owns; caller-supplied duplicates are dropped.
const RESERVED_HEADERS: &[&str] = &[
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// Generates the `Sec-WebSocket-Key` value: 16 random bytes, base64-encoded.
pub fn generate_key<R: RngCore>(rng: &mut R) -> String {
    let mut nonce = [0u8; 16];
    rng.fill_bytes(&mut nonce);

    general_purpose::STANDARD.encode(nonce)
}

/// The `Sec-WebSocket-Accept` value a compliant server must answer with:
/// base64(SHA-1(key + GUID)).
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();

    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID.as_bytes());

    general_purpose::STANDARD.encode(sha1.finalize())
}

/// Renders the HTTP/1.1 upgrade request for `request` with the given key.
///
/// Fails with [`Error::InvalidRequest`] unless the request is a no-body GET.
pub fn upgrade_request(request: &Request, key: &str) -> Result<Vec<u8>, Error> {
    if request.method() != "GET" {
        return Err(Error::InvalidRequest(format!(
            "request must be GET: {}",
            request.method()
        )));
    }

    if request.has_body() {
        return Err(Error::InvalidRequest(
            "request must not have a body".to_owned(),
        ));
    }

    let mut head = String::with_capacity(256);

    head.push_str(request.method());
    head.push(' ');
    head.push_str(request.path());
    head.push_str(" HTTP/1.1\r\n");

    for (name, value) in request.headers() {
        if RESERVED_HEADERS.iter().any(|r| name.eq_ignore_ascii_case(r)) {
            continue;
        }

        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }

    head.push_str("Upgrade: websocket\r\n");
    head.push_str("Connection: Upgrade\r\n");
    head.push_str("Sec-WebSocket-Key: ");
    head.push_str(key);
    head.push_str("\r\n");
    head.push_str("Sec-WebSocket-Version: 13\r\n");
    head.push_str("\r\n");

    Ok(head.into_bytes())
}

/// Checks the server's reply against the handshake contract.
///
/// Every mismatch is reported with the literal expected and actual values,
/// and the offending response rides inside the error.
pub fn validate_upgrade(response: &Response, key: &str) -> Result<(), Error> {
    if response.code() != 101 {
        return Err(Error::protocol_with_response(
            format!("expected HTTP 101 response but was '{}'", response.status()),
            response,
        ));
    }

    let connection = response.header("Connection");
    if !connection.is_some_and(|v| v.eq_ignore_ascii_case("Upgrade")) {
        return Err(Error::protocol_with_response(
            format!(
                "expected 'Connection' header value 'Upgrade' but was '{}'",
                connection.unwrap_or("<missing>")
            ),
            response,
        ));
    }

    let upgrade = response.header("Upgrade");
    if !upgrade.is_some_and(|v| v.eq_ignore_ascii_case("websocket")) {
        return Err(Error::protocol_with_response(
            format!(
                "expected 'Upgrade' header value 'websocket' but was '{}'",
                upgrade.unwrap_or("<missing>")
            ),
            response,
        ));
    }

    let expected = accept_key(key);
    let accept = response.header("Sec-WebSocket-Accept");
    if accept != Some(expected.as_str()) {
        return Err(Error::protocol_with_response(
            format!(
                "expected 'Sec-WebSocket-Accept' header value '{}' but was '{}'",
                expected,
                accept.unwrap_or("<missing>")
            ),
            response,
        ));
    }

    Ok(())
}

/// Performs the whole upgrade over an established stream: writes the request,
/// reads the server's reply and validates it.
pub(crate) async fn perform<S>(stream: &mut S, request: &Request) -> Result<Response, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = generate_key(&mut rand::rng());
    let head = upgrade_request(request, &key)?;

    stream.write_all(&head).await?;
    stream.flush().await?;

    let response = read_response(stream).await?;
    validate_upgrade(&response, &key)?;

    Ok(response)
}
