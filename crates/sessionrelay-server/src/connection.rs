//! One client connection: a read loop (parse, rate-limit, dispatch) and a
//! write loop (drain the outbound channel), each able to close the other
//! down without the other panicking (§5 suspension points, §7 propagation).

use std::sync::{Arc, Mutex};

use sessionrelay_types::BridgeEvent;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::Error;
use crate::rate_limit::RateLimiter;
use crate::server::Server;
use crate::wire::{OutboundMessage, Request, RequestId, Response};

/// §6: a single transport message, request or response, is capped at
/// 512 KiB; a larger inbound line closes the connection.
const MAX_MESSAGE_BYTES: usize = 512 * 1024;

pub struct ConnectionState {
    pub client_id: String,
    pub(crate) running_session: Mutex<Option<String>>,
    pub(crate) watched_session: Mutex<Option<String>>,
}

impl ConnectionState {
    fn new(client_id: String) -> Self {
        ConnectionState {
            client_id,
            running_session: Mutex::new(None),
            watched_session: Mutex::new(None),
        }
    }
}

/// Bridges the hub's synchronous `Subscriber::send` into a client's async
/// outbound channel. A full channel is a drop-with-warning (§4.8
/// "Delivery"), not a quarantine; only a closed channel (the client is
/// gone) reports failure so the hub removes this subscriber.
pub struct ClientSink {
    tx: tokio::sync::mpsc::Sender<OutboundMessage>,
}

impl sessionrelay_runtime::Subscriber for ClientSink {
    fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
        let notification = crate::notify::to_notification(&event);
        match self.tx.try_send(OutboundMessage::Notification(notification)) {
            Ok(()) => Ok(()),
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                sessionrelay_core::log::warn("server", "outbound channel full, dropping event");
                Ok(())
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => Err(()),
        }
    }
}

/// Drives one client connection to completion. `reader`/`writer` are the
/// two halves of whatever transport (stdio, a socket, ...) the caller set
/// up; ping/pong keepalive on that transport is the caller's concern (§4.8).
pub async fn handle_connection<R, W>(server: Arc<Server>, reader: R, writer: W)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let client_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = tokio::sync::mpsc::channel::<OutboundMessage>(256);

    let subscriber = server.registry.connect(client_id.clone(), ClientSink { tx: tx.clone() });
    subscriber.subscribe_workspace(server.workspace_id.clone());

    let write_task = tokio::spawn(write_loop(writer, rx));

    let conn = ConnectionState::new(client_id.clone());
    let mut limiter = RateLimiter::new(server.rate_limit_per_minute);
    read_loop(&server, &conn, reader, &tx, &mut limiter).await;

    drop(tx);
    let _ = write_task.await;

    server.watches.unwatch_all(&client_id);
    let orphaned = server.registry.disconnect(&client_id);
    if !orphaned.is_empty() {
        sessionrelay_core::log::debug("server", &format!("{} workspace(s) left with no watchers on disconnect", orphaned.len()));
    }
}

async fn write_loop<W: tokio::io::AsyncWrite + Unpin>(writer: W, mut rx: tokio::sync::mpsc::Receiver<OutboundMessage>) {
    let mut writer = writer;
    while let Some(message) = rx.recv().await {
        let Ok(line) = message.to_line() else { continue };
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
}

async fn read_loop<R: tokio::io::AsyncRead + Unpin>(
    server: &Arc<Server>,
    conn: &ConnectionState,
    reader: R,
    tx: &tokio::sync::mpsc::Sender<OutboundMessage>,
    limiter: &mut RateLimiter,
) {
    let mut lines = BufReader::new(reader);
    let mut buf = String::new();
    loop {
        buf.clear();
        let read = lines.read_line(&mut buf).await;
        match read {
            Ok(0) => break, // client closed the connection
            Ok(_) => {}
            Err(_) => break,
        }
        if buf.len() > MAX_MESSAGE_BYTES {
            sessionrelay_core::log::warn("server", "inbound message exceeded the size limit, closing connection");
            break;
        }
        let trimmed = buf.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !limiter.record() {
            sessionrelay_core::log::warn("server", "client exceeded the inbound rate limit, closing connection");
            break;
        }

        let request: Request = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(err) => {
                sessionrelay_core::log::debug("server", &format!("dropping malformed request: {err}"));
                continue;
            }
        };

        let wants_response = request.wants_response();
        let id = request.id.clone().unwrap_or(RequestId::Number(0));
        let result = crate::commands::dispatch(server, conn, &request.method, request.params);
        if !wants_response {
            continue;
        }
        let response = match result {
            Ok(value) => Response::ok(id, value),
            Err(err) => Response::err(id, &err),
        };
        let fatal = matches!(&response.error, Some(_)) && result_is_fatal(&response);
        let _ = tx.try_send(OutboundMessage::Response(response));
        if fatal {
            break;
        }
    }
}

fn result_is_fatal(response: &Response) -> bool {
    response
        .error
        .as_ref()
        .is_some_and(|e| e.code == Error::RateLimited.code().0 || e.code == Error::HubNotRunning.code().0)
}
