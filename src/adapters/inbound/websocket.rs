use crate::domains::broadcast::BroadcastHub;
use crate::domains::logger::DynLogger;
use futures_util::stream::{self, Stream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Pause after a failed accept, e.g. when file descriptors run out.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts WebSocket clients and streams hub snapshots to each as JSON text frames.
/// One connection owns exactly one subscription.
pub struct WebSocketGateway {
    hub: BroadcastHub,
    logger: DynLogger,
}

impl WebSocketGateway {
    pub fn new(hub: BroadcastHub, logger: DynLogger) -> Self {
        Self { hub, logger }
    }

    /// Accepts connections for as long as the listener lives. Accept errors are logged and
    /// retried after a short pause.
    pub async fn serve(&self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            self.logger.info(&format!("Subscriber endpoint listening on ws://{}", addr));
        }
        let incoming = stream::unfold(listener, |listener| async move {
            let next = listener.accept().await;
            Some((next, listener))
        });
        self.serve_incoming(incoming).await;
    }

    /// Serves each accepted connection until `incoming` ends.
    pub async fn serve_incoming<S>(&self, incoming: S)
    where
        S: Stream<Item = std::io::Result<(TcpStream, SocketAddr)>>,
    {
        tokio::pin!(incoming);
        while let Some(accepted) = incoming.next().await {
            let (stream, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    self.logger.warn(&format!("Accept failed: {}", e));
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            let hub = self.hub.clone();
            let logger = self.logger.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, hub, &logger).await {
                    logger.warn(&format!("Connection {} closed with error: {}", addr, e));
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: BroadcastHub,
    logger: &DynLogger,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut subscription = hub.subscribe().await;
    logger.info(&format!("Connection {} subscribed as {}", addr, subscription.id()));

    let outcome = async {
        loop {
            tokio::select! {
                message = subscription.recv() => match message {
                    Some(message) => ws_write.send(Message::Text(message.to_wire_json()?)).await?,
                    None => {
                        let _ = ws_write.send(Message::Close(None)).await;
                        break;
                    }
                },
                frame = ws_read.next() => match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    subscription.detach();
    logger.info(&format!("Connection {} disconnected", addr));
    outcome
}
