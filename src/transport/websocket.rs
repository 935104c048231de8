use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::session::WorkItem;
use crate::transport::message::StreamEvent;

/// How a connection to the event stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    /// The server closed the stream or it failed; try again.
    Dropped,
    /// The session stopped taking work; stop for good.
    SessionClosed,
}

/// Subscribes to the admin server's push events and feeds them to the
/// session, reconnecting whenever the stream drops.
///
/// Outbound frames (fire-and-forget commands) share the same connection.
/// Frames queued while disconnected, or whose send failed when the stream
/// dropped, are sent after the next connect.
#[derive(Debug, Clone)]
pub struct EventStreamListener {
    url: String,
    reconnect_delay: Duration,
}

impl EventStreamListener {
    pub fn new(url: &str, reconnect_delay: Duration) -> Self {
        Self {
            url: url.to_string(),
            reconnect_delay,
        }
    }

    pub async fn run(
        self,
        work: UnboundedSender<WorkItem>,
        mut outbound: UnboundedReceiver<WsMessage>,
    ) {
        let mut unsent = None;
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    info!(url = %self.url, "Connected to event stream");
                    let outcome = pump(stream, &work, &mut outbound, &mut unsent).await;
                    if outcome == Disconnect::SessionClosed {
                        break;
                    }
                    warn!(url = %self.url, "Event stream disconnected");
                }
                Err(e) => {
                    error!(url = %self.url, error = %e, "Event stream connection failed");
                }
            }

            if work.is_closed() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
        info!("Event stream listener stopped");
    }
}

async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    work: &UnboundedSender<WorkItem>,
    outbound: &mut UnboundedReceiver<WsMessage>,
    unsent: &mut Option<WsMessage>,
) -> Disconnect {
    let (mut ws_sender, mut ws_receiver) = stream.split();
    let mut outbound_open = true;

    if let Some(msg) = unsent.take() {
        debug!("Resending frame from previous connection");
        if !send_or_keep(&mut ws_sender, msg, unsent).await {
            return Disconnect::Dropped;
        }
    }

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if !forward_frame(text.as_str(), work) {
                        return Disconnect::SessionClosed;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => return Disconnect::Dropped,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "Event stream read failed");
                    return Disconnect::Dropped;
                }
            },
            msg = outbound.recv(), if outbound_open => match msg {
                Some(msg) => {
                    if !send_or_keep(&mut ws_sender, msg, unsent).await {
                        return Disconnect::Dropped;
                    }
                }
                None => {
                    debug!("Outbound command channel closed");
                    outbound_open = false;
                }
            },
            _ = work.closed() => return Disconnect::SessionClosed,
        }
    }
}

/// Send `msg`, parking it in `unsent` when the sink fails. Returns false on
/// failure.
pub(super) async fn send_or_keep<S>(
    sink: &mut S,
    msg: WsMessage,
    unsent: &mut Option<WsMessage>,
) -> bool
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    match sink.send(msg.clone()).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Failed to send outbound frame");
            *unsent = Some(msg);
            false
        }
    }
}

/// Decode one text frame and hand it to the session. Returns false once the
/// session is gone.
fn forward_frame(text: &str, work: &UnboundedSender<WorkItem>) -> bool {
    match StreamEvent::from_frame(text) {
        Ok(Some(event)) => work.send(WorkItem::Stream(event)).is_ok(),
        Ok(None) => true,
        Err(e) => {
            warn!(error = %e, frame = text, "Invalid event frame");
            true
        }
    }
}
