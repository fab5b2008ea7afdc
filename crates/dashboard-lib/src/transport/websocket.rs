//! WebSocket push channel
//!
//! Keeps a single connection to the push endpoint open, forwarding every
//! telemetry/decision tail to the supervisor. Unplanned closes trigger a
//! reconnect after an exponentially growing delay; `close_by_app` stops the
//! channel for good until `connect` is called again.

use super::{DashboardEvent, ReconnectBackoff};
use crate::error::Result;
use crate::models::StreamFrame;
use crate::observability::ClientMetrics;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Parse a pushed frame; either tail may be missing
pub fn parse_frame(text: &str) -> Result<StreamFrame> {
    Ok(serde_json::from_str(text)?)
}

/// Handle to the push channel task
pub struct WebSocketChannel {
    url: String,
    backoff: ReconnectBackoff,
    events: mpsc::Sender<DashboardEvent>,
    closed_by_app: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    metrics: ClientMetrics,
}

impl WebSocketChannel {
    pub fn new(
        url: impl Into<String>,
        backoff: ReconnectBackoff,
        events: mpsc::Sender<DashboardEvent>,
        metrics: ClientMetrics,
    ) -> Self {
        let (closed_by_app, _) = watch::channel(false);
        Self {
            url: url.into(),
            backoff,
            events,
            closed_by_app,
            task: None,
            metrics,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start the connection task.
    ///
    /// No-op while a live task exists. After `close_by_app` the new task first
    /// waits for the previous one to finish its close handshake, so at most
    /// one socket is ever open.
    pub fn connect(&mut self) {
        if self.is_running() && !*self.closed_by_app.borrow() {
            return;
        }

        // each task watches its own flag so re-arming never hides a pending close
        let (closed_by_app, receiver) = watch::channel(false);
        let previous_flag = std::mem::replace(&mut self.closed_by_app, closed_by_app);
        previous_flag.send_replace(true);

        let worker = SocketWorker {
            url: self.url.clone(),
            backoff: self.backoff.clone(),
            events: self.events.clone(),
            closed_by_app: receiver,
            metrics: self.metrics.clone(),
        };

        info!(url = %self.url, "Starting WebSocket channel");
        let previous = self.task.take();
        self.task = Some(tokio::spawn(worker.run(previous)));
    }

    /// Close the socket and suppress every future reconnect
    pub fn close_by_app(&self) {
        info!(url = %self.url, "Closing WebSocket channel");
        self.closed_by_app.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Wait until the connection task has fully stopped
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.closed_by_app.send_replace(true);
    }
}

/// Connection loop owned by the spawned task
struct SocketWorker {
    url: String,
    backoff: ReconnectBackoff,
    events: mpsc::Sender<DashboardEvent>,
    closed_by_app: watch::Receiver<bool>,
    metrics: ClientMetrics,
}

impl SocketWorker {
    async fn run(mut self, previous: Option<JoinHandle<()>>) {
        if let Some(previous) = previous {
            let _ = previous.await;
        }

        loop {
            if self.is_closed_by_app() || self.events.is_closed() {
                break;
            }

            self.emit(DashboardEvent::WsConnecting).await;

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => Some(result),
                _ = wait_for_close(&mut self.closed_by_app) => None,
            };

            match connected {
                Some(Ok((socket, _response))) => {
                    self.backoff.reset();
                    info!(url = %self.url, "WebSocket connected");
                    self.emit(DashboardEvent::WsOpened).await;
                    self.pump(socket).await;
                }
                Some(Err(e)) => {
                    warn!(url = %self.url, error = %e, "WebSocket connect failed");
                }
                None => {}
            }

            let by_app = self.is_closed_by_app();
            self.emit(DashboardEvent::WsClosed { by_app }).await;
            if by_app {
                break;
            }

            let delay = self.backoff.next_delay();
            self.metrics.inc_reconnect_attempts();
            debug!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.backoff.attempts(),
                "Scheduling WebSocket reconnect"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_close(&mut self.closed_by_app) => {
                    self.emit(DashboardEvent::WsClosed { by_app: true }).await;
                    break;
                }
            }
        }

        debug!(url = %self.url, "WebSocket channel stopped");
    }

    /// Read frames until the socket closes, errors, or the app closes it
    async fn pump(&mut self, mut socket: Socket) {
        loop {
            tokio::select! {
                message = socket.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text).await,
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.handle_text(text).await,
                        Err(e) => {
                            self.metrics.inc_malformed_frames();
                            warn!(error = %e, "Dropping non UTF-8 WebSocket frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(reason = ?frame, "WebSocket closed by server");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error, closing socket");
                        let _ = socket.close(None).await;
                        return;
                    }
                    None => return,
                },
                _ = wait_for_close(&mut self.closed_by_app) => {
                    let _ = socket.close(None).await;
                    return;
                }
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        match parse_frame(text) {
            Ok(frame) => {
                self.metrics.inc_ws_frames();
                if let Some(tail) = frame.telemetry_tail.filter(|t| !t.is_empty()) {
                    self.emit(DashboardEvent::WsTelemetry(tail)).await;
                }
                if let Some(tail) = frame.decisions_tail.filter(|d| !d.is_empty()) {
                    self.emit(DashboardEvent::WsDecisions(tail)).await;
                }
            }
            Err(e) => {
                self.metrics.inc_malformed_frames();
                warn!(error = %e, "Dropping malformed WebSocket frame");
            }
        }
    }

    async fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Supervisor gone, dropping WebSocket event");
        }
    }

    fn is_closed_by_app(&self) -> bool {
        *self.closed_by_app.borrow()
    }
}

/// Resolves once the close flag is set (or its sender is gone)
async fn wait_for_close(closed: &mut watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_with_both_tails() {
        let frame = parse_frame(
            r#"{"telemetry_tail":[{"timestamp":1,"service":"api","cost_per_min":0.01}],"decisions_tail":[]}"#,
        )
        .unwrap();

        let telemetry = frame.telemetry_tail.unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].cost_per_min, 0.01);
        assert!(frame.decisions_tail.unwrap().is_empty());
    }

    #[test]
    fn test_parse_frame_with_neither_tail() {
        let frame = parse_frame("{}").unwrap();
        assert!(frame.telemetry_tail.is_none());
        assert!(frame.decisions_tail.is_none());
    }

    #[test]
    fn test_parse_frame_rejects_garbage() {
        assert!(parse_frame("not json").unwrap_err().is_protocol());
        assert!(parse_frame(r#"{"telemetry_tail": 5}"#).is_err());
    }

    #[tokio::test]
    async fn test_channel_not_running_before_connect() {
        let (tx, _rx) = mpsc::channel(8);
        let channel = WebSocketChannel::new(
            "ws://127.0.0.1:9/ws",
            ReconnectBackoff::default(),
            tx,
            ClientMetrics::new(),
        );
        assert!(!channel.is_running());
        assert_eq!(channel.url(), "ws://127.0.0.1:9/ws");
    }
}
