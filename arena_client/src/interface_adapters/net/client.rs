use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message, client::IntoClientRequest},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub inbound_capacity: usize,
    pub outbound_capacity: usize,
}

#[derive(Debug)]
pub enum ConnectError {
    InvalidUrl(tungstenite::Error),
    Timeout(Duration),
    Transport(tungstenite::Error),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::InvalidUrl(e) => write!(f, "invalid server url: {e}"),
            ConnectError::Timeout(after) => {
                write!(f, "connect timed out after {}ms", after.as_millis())
            }
            ConnectError::Transport(e) => write!(f, "websocket connect failed: {e}"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::InvalidUrl(e) | ConnectError::Transport(e) => Some(e),
            ConnectError::Timeout(_) => None,
        }
    }
}

/// Why the inbound side stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    // Peer sent a close frame.
    Remote { code: u16, reason: String },
    // Stream ended without a close frame.
    Eof,
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Remote { code, reason } if reason.is_empty() => {
                write!(f, "closed by server ({code})")
            }
            CloseReason::Remote { code, reason } => {
                write!(f, "closed by server ({code}: {reason})")
            }
            CloseReason::Eof => f.write_str("stream ended"),
            CloseReason::Error(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Events the reader task queues for the single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(String),
    Closed(CloseReason),
}

#[derive(Debug)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Queue for the writer task was full or is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
    Closed,
}

/// Cloneable handle onto the writer task's queue.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<OutboundFrame>,
}

impl Outbound {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn send_text(&self, text: String) -> Result<(), QueueError> {
        self.tx
            .try_send(OutboundFrame::Text(text))
            .map_err(|e| match e {
                TrySendError::Full(_) => QueueError::Full,
                TrySendError::Closed(_) => QueueError::Closed,
            })
    }

    /// Asks the writer to send a close frame and stop.
    pub fn close(&self) {
        let _ = self.tx.try_send(OutboundFrame::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct Connection {
    pub inbound_rx: mpsc::Receiver<Inbound>,
    pub outbound: Outbound,
}

/// Opens the websocket and spawns the reader and writer tasks.
pub async fn connect(url: &str, settings: TransportSettings) -> Result<Connection, ConnectError> {
    let request = url.into_client_request().map_err(ConnectError::InvalidUrl)?;

    let (socket, response) = timeout(settings.connect_timeout, connect_async(request))
        .await
        .map_err(|_| ConnectError::Timeout(settings.connect_timeout))?
        .map_err(ConnectError::Transport)?;
    info!(url, status = %response.status(), "connected");

    let (sink, stream) = socket.split();
    let (inbound_tx, inbound_rx) = mpsc::channel(settings.inbound_capacity);
    let (outbound, outbound_rx) = Outbound::channel(settings.outbound_capacity);

    tokio::spawn(read_loop(stream, inbound_tx));
    tokio::spawn(write_loop(sink, outbound_rx));

    Ok(Connection {
        inbound_rx,
        outbound,
    })
}

// Forwards text frames in arrival order; ends with exactly one `Closed`.
pub async fn read_loop<S>(mut stream: S, inbound_tx: mpsc::Sender<Inbound>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame = Inbound::Frame(text.as_str().to_owned());
                if inbound_tx.send(frame).await.is_err() {
                    debug!("inbound queue dropped; reader exiting");
                    return;
                }
            }
            Some(Ok(Message::Binary(bytes))) => {
                warn!(bytes = bytes.len(), "binary frame not supported; dropping");
            }
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(frame) => CloseReason::Remote {
                        code: u16::from(frame.code),
                        reason: frame.reason.as_str().to_owned(),
                    },
                    None => CloseReason::Remote {
                        code: 1005,
                        reason: String::new(),
                    },
                };
            }
            // Pings are answered by tungstenite on the next write.
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Err(e)) => break CloseReason::Error(e.to_string()),
            None => break CloseReason::Eof,
        }
    };

    debug!(%reason, "reader finished");
    let _ = inbound_tx.send(Inbound::Closed(reason)).await;
}

pub async fn write_loop<K>(mut sink: K, mut outbound_rx: mpsc::Receiver<OutboundFrame>)
where
    K: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(frame) = outbound_rx.recv().await {
        match frame {
            OutboundFrame::Text(text) => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(error = %e, "failed to write frame; writer exiting");
                    return;
                }
            }
            OutboundFrame::Close => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!(error = %e, "failed to send close frame");
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
    debug!("writer finished");
}
