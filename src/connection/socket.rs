//! WebSocket Connection Handling
//!
//! Turns one upgraded socket into connect/message/disconnect events for the
//! relay engine and writes the engine's frames and close requests back out.

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::management::AppState;
use crate::protocol::Payload;
use crate::relay::{CloseRequest, ConnectionId, Event, Outbox, RelayEngine};

/// How long the writer gets to finish the close handshake once the reader stops
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Reservation of one connection under `max_connections`
pub struct ConnectionSlot {
    counter: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Take a slot, or `None` when `max` are already open
    pub fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        let previous = counter.fetch_add(1, Ordering::AcqRel);
        if previous >= max {
            counter.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        Some(Self {
            counter: Arc::clone(counter),
        })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Upgrade handler for the signaling endpoint
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutting_down.load(Ordering::Relaxed) {
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }

    let max = state.config.server.max_connections;
    let Some(slot) = ConnectionSlot::acquire(&state.open_sockets, max) else {
        warn!("Connection limit of {} reached, refusing upgrade", max);
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    ws.max_message_size(state.config.relay.max_message_size)
        .on_upgrade(move |socket| async move {
            let _slot = slot;
            handle_socket(socket, state).await;
        })
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, outbox) = state.engine.connect();
    state.metrics.connection_opened();
    run_connection(socket, id, outbox, &state.engine).await;
    state.metrics.connection_closed();
}

#[instrument(skip_all, fields(connection_id = id))]
async fn run_connection(socket: WebSocket, id: ConnectionId, outbox: Outbox, engine: &RelayEngine) {
    info!("Connection opened");
    let (sink, stream) = socket.split();

    let mut writer = tokio::spawn(write_loop(sink, outbox));

    let (event, writer_done) = tokio::select! {
        result = read_loop(stream, id, engine) => match result {
            Ok(()) => (Event::Disconnect, false),
            Err(e) => (Event::Error(e.to_string()), false),
        },
        _ = &mut writer => (Event::Disconnect, true),
    };

    // releasing the peer closes its outbox, the writer then flushes the close reply
    engine.handle(id, event);
    if !writer_done && tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        debug!("Writer did not finish the close handshake in time");
        writer.abort();
    }
    info!("Connection closed");
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    id: ConnectionId,
    engine: &RelayEngine,
) -> Result<(), axum::Error> {
    while let Some(message) = stream.next().await {
        let payload = match message? {
            Message::Text(text) => Payload::Text(text),
            Message::Binary(data) => Payload::Binary(Bytes::from(data)),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(frame) => {
                debug!(?frame, "Peer sent close");
                return Ok(());
            }
        };
        engine.handle(id, Event::Message(payload));
    }
    Ok(())
}

async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut outbox: Outbox) {
    loop {
        tokio::select! {
            biased;
            frame = outbox.frames.recv() => {
                let Some(payload) = frame else {
                    finish_close(&mut sink).await;
                    return;
                };
                if let Err(e) = sink.send(into_message(payload)).await {
                    debug!(error = %e, "Send failed");
                    return;
                }
            }
            changed = outbox.close.changed() => {
                if changed.is_err() {
                    finish_close(&mut sink).await;
                    return;
                }
                let request = *outbox.close.borrow_and_update();
                if let Some(request) = request {
                    // frames queued before the close still go out first
                    while let Ok(payload) = outbox.frames.try_recv() {
                        if sink.send(into_message(payload)).await.is_err() {
                            return;
                        }
                    }
                    send_close(&mut sink, request).await;
                    return;
                }
            }
        }
    }
}

async fn send_close(sink: &mut SplitSink<WebSocket, Message>, request: CloseRequest) {
    debug!(code = request.code, reason = request.reason, "Closing connection");
    let frame = CloseFrame {
        code: request.code,
        reason: Cow::Borrowed(request.reason),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not delivered");
    }
}

/// Flush a pending close reply, or start the close handshake
async fn finish_close(sink: &mut SplitSink<WebSocket, Message>) {
    if let Err(e) = sink.close().await {
        debug!(error = %e, "Close handshake not completed");
    }
}

fn into_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text),
        Payload::Binary(data) => Message::Binary(data.to_vec()),
    }
}
