//! WebSocket connector built on tokio-tungstenite.

use crate::error::gateway::GatewayError;
use crate::transport::{Connector, Transport, TransportEvent, TransportPeer};

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::spawn as TokioSpawn;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Opens gateway transports over WebSocket.
///
/// Each open transport runs two background tasks:
/// - writer: forwards outgoing frames as text messages, sends a Close frame
///   once the session drops the transport
/// - reader: forwards text (and UTF-8 binary) messages, reports read errors,
///   and always finishes with [`TransportEvent::Closed`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Transport, GatewayError>> {
        let url = url.to_string();
        Box::pin(async move { open_websocket(&url).await })
    }
}

async fn open_websocket(url: &str) -> Result<Transport, GatewayError> {
    Url::parse(url)?;

    let (ws_stream, _response) = connect_async(url).await?;
    info!("WebSocket open to {url}");

    let (mut write, mut read) = ws_stream.split();
    let (transport, peer) = Transport::pair();
    let TransportPeer {
        mut outgoing,
        incoming,
    } = peer;

    TokioSpawn(async move {
        while let Some(text) = outgoing.recv().await {
            if let Err(e) = write.send(Message::text(text)).await {
                warn!("WebSocket write failed: {e}");
                break;
            }
        }
        if let Err(e) = write.close().await {
            debug!("WebSocket close handshake failed: {e}");
        }
        debug!("WebSocket writer finished");
    });

    TokioSpawn(async move {
        while let Some(message) = read.next().await {
            let event = match message {
                Ok(Message::Text(text)) => TransportEvent::Message(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => TransportEvent::Message(text),
                    Err(_) => {
                        debug!("Dropping non UTF-8 binary message ({} bytes)", data.len());
                        continue;
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!("WebSocket close frame received: {frame:?}");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    let _ = incoming.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            };

            // Receiver gone: the session detached this transport.
            if incoming.send(event).is_err() {
                debug!("WebSocket reader detached");
                return;
            }
        }
        let _ = incoming.send(TransportEvent::Closed);
    });

    Ok(transport)
}
