//! Operator link server.
//!
//! Newline-delimited JSON over TCP. Each connection is registered as a
//! telemetry [`Observer`] for its lifetime and feeds its inbound lines to
//! the [`CommandDispatcher`]. Rejection replies go to that connection only.

use crate::command::CommandDispatcher;
use crate::error::DaqError;
use crate::shared::SharedState;
use crate::telemetry::{DeliveryError, Observer, ObserverRegistry, Outbound};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Outbound lines buffered per connection before it counts as stalled.
const OBSERVER_QUEUE: usize = 256;

/// How often idle tasks re-check the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Time a closing connection gets to flush queued lines.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Observer backed by a connection's outbound queue.
struct ChannelObserver {
    id: u64,
    tx: mpsc::Sender<String>,
}

impl Observer for ChannelObserver {
    fn id(&self) -> u64 {
        self.id
    }

    fn deliver(&self, line: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(line.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// TCP front end of the operator link.
pub struct OperatorServer {
    listener: TcpListener,
    dispatcher: Arc<CommandDispatcher>,
    observers: Arc<ObserverRegistry>,
    shared: Arc<SharedState>,
}

impl OperatorServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    /// Returns `DaqError::Link` if the address cannot be bound.
    pub async fn bind(
        addr: &str,
        dispatcher: Arc<CommandDispatcher>,
        observers: Arc<ObserverRegistry>,
        shared: Arc<SharedState>,
    ) -> Result<Self, DaqError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Operator link listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
            observers,
            shared,
        })
    }

    /// Bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown flag is set.
    pub async fn run(self) {
        let mut poll = tokio::time::interval(SHUTDOWN_POLL);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("Operator connected from {}", peer);
                        tokio::spawn(serve_connection(
                            stream,
                            peer,
                            Arc::clone(&self.dispatcher),
                            Arc::clone(&self.observers),
                            Arc::clone(&self.shared),
                        ));
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                },
                _ = poll.tick() => {
                    if self.shared.should_stop() {
                        break;
                    }
                }
            }
        }
        info!("Operator link closed");
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<CommandDispatcher>,
    observers: Arc<ObserverRegistry>,
    shared: Arc<SharedState>,
) {
    let id = observers.next_id();
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::channel::<String>(OBSERVER_QUEUE);
    observers.register(Arc::new(ChannelObserver { id, tx: tx.clone() }));

    let mut writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                debug!("Write to operator failed: {}", e);
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    let mut poll = tokio::time::interval(SHUTDOWN_POLL);
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(reply) = dispatcher.handle(&line) {
                        match Outbound::console(reply).to_line() {
                            Ok(reply) => {
                                if tx.try_send(reply).is_err() {
                                    warn!("Reply to {} dropped", peer);
                                }
                            }
                            Err(e) => error!("Failed to serialize reply: {}", e),
                        }
                    }
                }
                Ok(None) => {
                    info!("Operator {} disconnected", peer);
                    break;
                }
                Err(e) => {
                    warn!("Read from {} failed: {}", peer, e);
                    break;
                }
            },
            _ = poll.tick() => {
                if shared.should_stop() {
                    break;
                }
            }
        }
    }

    observers.remove(id);
    drop(tx);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer_task).await.is_err() {
        writer_task.abort();
    }
}
