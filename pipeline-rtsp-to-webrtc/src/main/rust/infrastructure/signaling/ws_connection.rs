use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use warp::ws::{Message, WebSocket};

use super::dispatcher::SignalingDispatcher;
use super::messages::{OutboundMessage, ServerNotification};
use crate::domain::value_objects::{ConnectionId, ProducerEvent};

/// Drive one signaling socket until the client goes away.
///
/// Frames are queued to a single worker so requests of a connection complete
/// in arrival order. The session is torn down as soon as the socket closes,
/// even while a request is still in flight.
pub async fn handle_socket(socket: WebSocket, dispatcher: Arc<SignalingDispatcher>) {
    let connection_id = ConnectionId::generate();
    let events = match dispatcher.service().connect(&connection_id) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(%connection_id, error = %e, "Failed to open session");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let text = match message.to_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode signaling message");
                    continue;
                }
            };
            if ws_tx.send(Message::text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let forwarder = tokio::spawn(forward_events(
        connection_id.clone(),
        events,
        out_tx.clone(),
    ));

    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<String>();
    let worker = {
        let dispatcher = Arc::clone(&dispatcher);
        let connection_id = connection_id.clone();
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = request_rx.recv().await {
                if let Some(reply) = dispatcher.handle_text(&connection_id, &text).await {
                    // Socket already gone; keep draining so in-flight work still cleans up.
                    let _ = out_tx.send(reply);
                }
            }
        })
    };
    drop(out_tx);

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        if message.is_close() {
            break;
        }
        if let Ok(text) = message.to_str() {
            if request_tx.send(text.to_string()).is_err() {
                break;
            }
        } else if message.is_binary() {
            tracing::warn!(%connection_id, "Ignoring binary frame");
        }
    }

    tracing::debug!(%connection_id, "Socket closed");
    drop(request_tx);
    dispatcher.service().disconnect(&connection_id).await;

    forwarder.abort();
    let _ = forwarder.await;
    let _ = worker.await;
    let _ = writer.await;
}

/// Push producer events to the client, skipping the ones it caused itself.
async fn forward_events(
    connection_id: ConnectionId,
    mut events: broadcast::Receiver<ProducerEvent>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if !event.is_for(&connection_id) {
                    continue;
                }
                let notification = ServerNotification::producer(&event);
                if out_tx.send(OutboundMessage::Notification(notification)).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(%connection_id, skipped, "Notification subscriber lagging");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
