//! WebSocket inbound endpoint
//!
//! Performs the server side of the WebSocket handshake and adapts the
//! resulting connection into an [`InboundSink`] / [`InboundStream`] pair.

use super::{InboundSink, InboundStream};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use futures::{future, SinkExt, StreamExt, TryStreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::trace;

/// Accept a WebSocket upgrade on `stream`
///
/// Returns the WebSocket together with the `Sec-WebSocket-Protocol` request
/// header, if any. That header is echoed back in the handshake response so
/// that browsers accept the upgrade.
pub async fn accept<S>(stream: S) -> io::Result<(WebSocketStream<S>, Option<String>)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut protocol = None;

    let callback = |request: &Request, mut response: Response| {
        if let Some(value) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
            protocol = value.to_str().ok().map(str::to_string);
            response
                .headers_mut()
                .insert(SEC_WEBSOCKET_PROTOCOL, value.clone());
        }
        Ok::<_, ErrorResponse>(response)
    };

    let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .map_err(io::Error::other)?;

    Ok((ws, protocol))
}

/// Decode the first frame carried in the `Sec-WebSocket-Protocol` header
///
/// The value is base64url. Standard alphabet characters and padding are
/// tolerated. An empty value means no early data.
pub fn decode_early_data(value: &str) -> Result<Option<Bytes>, base64::DecodeError> {
    let normalized: String = value
        .trim()
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    if normalized.is_empty() {
        return Ok(None);
    }

    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map(|data| Some(Bytes::from(data)))
}

/// Split a WebSocket into the endpoint halves a session consumes
///
/// Binary and text messages become payload chunks; control frames are
/// dropped. Outgoing chunks are sent as binary messages.
pub fn split_endpoint<S>(ws: WebSocketStream<S>) -> (impl InboundSink, impl InboundStream)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = ws.split();

    let sink = sink
        .sink_map_err(io::Error::other)
        .with(|data: Bytes| future::ready(Ok::<_, io::Error>(Message::Binary(data.to_vec()))));

    let stream = stream
        .map_err(io::Error::other)
        .try_filter_map(|message| future::ready(Ok(message_payload(message))));

    (sink, stream)
}

fn message_payload(message: Message) -> Option<Bytes> {
    match message {
        Message::Binary(data) => Some(Bytes::from(data)),
        Message::Text(text) => Some(Bytes::from(text)),
        other => {
            trace!("Ignoring WebSocket control message: {:?}", other);
            None
        }
    }
}
