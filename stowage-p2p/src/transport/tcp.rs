//! TCP transport binding.
//!
//! Owns the listener, the accept loop, and one task per connection. Each
//! connection task drives the handshake, then a framed read/write loop;
//! decoded frames are delivered to the application as [`Envelope`]s and
//! lifecycle changes as [`TransportEvent`]s.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::codec::{FrameCodec, LengthPrefixCodec};
use crate::config::TransportConfig;
use crate::envelope::Envelope;
use crate::error::{TransportError, TransportResult};
use crate::event::{DisconnectReason, TransportEvent};
use crate::peer::{Direction, Peer, PeerCommand, PeerInfo, TcpPeer};
use crate::registry::PeerRegistry;
use crate::transport::Transport;

/// TCP binding of [`Transport`].
///
/// Generic over the frame codec; every connection decodes with its own clone
/// of the transport's codec, so decode state never crosses streams.
pub struct TcpTransport<C = LengthPrefixCodec> {
    config: Arc<TransportConfig>,
    codec: C,
    registry: Arc<PeerRegistry>,
    local_addr: OnceLock<SocketAddr>,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    envelope_tx: Option<mpsc::Sender<Envelope>>,
    event_tx: Option<mpsc::Sender<TransportEvent>>,
}

/// Everything a connection task needs from its transport.
struct ConnShared<C> {
    config: Arc<TransportConfig>,
    codec: C,
    registry: Arc<PeerRegistry>,
    envelope_tx: Option<mpsc::Sender<Envelope>>,
    event_tx: Option<mpsc::Sender<TransportEvent>>,
}

impl<C: Clone> Clone for ConnShared<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            codec: self.codec.clone(),
            registry: self.registry.clone(),
            envelope_tx: self.envelope_tx.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<C> ConnShared<C> {
    /// Emit an event without ever stalling a connection task; events are
    /// dropped when the observer lags.
    fn emit(&self, event: TransportEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.try_send(event) {
                tracing::trace!(error = %e, "Dropping transport event");
            }
        }
    }
}

impl TcpTransport<LengthPrefixCodec> {
    /// Create a transport with the default length-prefixed codec, sized to
    /// the configured maximum frame.
    pub fn new(config: TransportConfig) -> Self {
        let codec = LengthPrefixCodec::with_max_frame_size(config.max_frame_size);
        Self::with_codec(config, codec)
    }
}

impl<C: FrameCodec> TcpTransport<C> {
    /// Create a transport using `codec` for framing.
    pub fn with_codec(config: TransportConfig, codec: C) -> Self {
        Self {
            config: Arc::new(config),
            codec,
            registry: Arc::new(PeerRegistry::new()),
            local_addr: OnceLock::new(),
            shutdown_tx: Mutex::new(None),
            envelope_tx: None,
            event_tx: None,
        }
    }

    /// Take the envelope delivery channel.
    ///
    /// Call before `listen_and_accept` or any dial; decoded frames are
    /// dropped while no receiver is attached.
    pub fn envelope_receiver(&mut self) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(self.config.envelope_capacity);
        self.envelope_tx = Some(tx);
        rx
    }

    /// Take the transport event channel.
    pub fn event_receiver(&mut self) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_capacity);
        self.event_tx = Some(tx);
        rx
    }

    /// The transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn shared(&self) -> ConnShared<C> {
        ConnShared {
            config: self.config.clone(),
            codec: self.codec.clone(),
            registry: self.registry.clone(),
            envelope_tx: self.envelope_tx.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

#[async_trait]
impl<C: FrameCodec> Transport for TcpTransport<C> {
    async fn listen_and_accept(&self) -> TransportResult<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        {
            let mut slot = self.shutdown_tx.lock().await;
            if slot.is_some() {
                return Err(TransportError::AlreadyListening);
            }
            *slot = Some(shutdown_tx);
        }

        let listener = match TcpListener::bind(self.config.bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                *self.shutdown_tx.lock().await = None;
                return Err(TransportError::Bind {
                    addr: self.config.bind_addr,
                    source,
                });
            }
        };

        let local_addr = listener.local_addr()?;
        let _ = self.local_addr.set(local_addr);
        tracing::info!(addr = %local_addr, "Listening for inbound connections");

        let shared = self.shared();
        tokio::spawn(accept_loop(listener, shared, shutdown_rx));

        Ok(())
    }

    async fn dial(&self, addr: SocketAddr) -> TransportResult<()> {
        if self.registry.contains(&addr).await {
            return Err(TransportError::AlreadyConnected { addr });
        }

        tracing::debug!(addr = %addr, "Dialing peer");

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::Io(e)),
            Err(_) => return Err(TransportError::ConnectTimeout { addr }),
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let info = PeerInfo::new(addr, Direction::Outbound);
        let shared = self.shared();
        let (peer, stream, command_rx) = establish(stream, info, &shared).await?;

        tokio::spawn(run_peer(peer, stream, command_rx, shared));

        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    async fn close(&self) -> TransportResult<()> {
        if let Some(tx) = self.shutdown_tx.lock().await.as_ref() {
            let _ = tx.send(()).await;
        }

        // Snapshot first; peer teardown takes the registry write lock.
        for peer in self.registry.peers().await {
            let _ = peer.close().await;
        }

        Ok(())
    }
}

/// Accept loop: runs until the shutdown channel fires.
///
/// Accept errors are not fatal to the transport; the loop logs and keeps
/// accepting. Each accepted connection gets its own task, so a slow
/// handshake never blocks the loop.
async fn accept_loop<C: FrameCodec>(
    listener: TcpListener,
    shared: ConnShared<C>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("Accept loop shutting down");
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
                        }

                        tracing::debug!(addr = %addr, "Accepted inbound connection");

                        let shared = shared.clone();
                        tokio::spawn(async move {
                            let info = PeerInfo::new(addr, Direction::Inbound);
                            match establish(stream, info, &shared).await {
                                Ok((peer, stream, command_rx)) => {
                                    run_peer(peer, stream, command_rx, shared).await;
                                }
                                Err(e) => {
                                    tracing::debug!(addr = %addr, error = %e, "Connection discarded");
                                }
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept error");
                    }
                }
            }
        }
    }
}

/// Gate a raw connection into the registry: handshake under timeout, then
/// register. On any failure the stream is dropped (closing the socket) and
/// the peer is never registered.
async fn establish<C: FrameCodec>(
    mut stream: TcpStream,
    info: PeerInfo,
    shared: &ConnShared<C>,
) -> TransportResult<(
    Arc<TcpPeer>,
    TcpStream,
    mpsc::UnboundedReceiver<PeerCommand>,
)> {
    let addr = info.addr;

    let negotiation = shared.config.handshake.negotiate(&mut stream, &info);
    match timeout(shared.config.handshake_timeout, negotiation).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(addr = %addr, error = %e, "Handshake failed");
            shared.emit(TransportEvent::HandshakeFailed {
                addr,
                reason: e.to_string(),
            });
            return Err(TransportError::Handshake(e));
        }
        Err(_) => {
            tracing::debug!(addr = %addr, "Handshake timed out");
            shared.emit(TransportEvent::HandshakeFailed {
                addr,
                reason: "timeout".to_string(),
            });
            return Err(TransportError::HandshakeTimeout);
        }
    }

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let peer = Arc::new(TcpPeer::new(info.clone(), command_tx));

    if !shared.registry.insert(peer.clone()).await {
        tracing::debug!(addr = %addr, "Duplicate connection; dropping");
        return Err(TransportError::AlreadyConnected { addr });
    }

    tracing::info!(addr = %addr, direction = %info.direction, "Peer connected");
    shared.emit(TransportEvent::PeerConnected {
        addr,
        direction: info.direction,
    });

    Ok((peer, stream, command_rx))
}

/// Per-connection read/write loop.
///
/// Runs until the stream ends, the stream fails, or a disconnect is
/// requested, then deregisters the peer. Fatal codec errors (including a
/// partial frame at end of stream) tear the connection down; transient ones
/// skip the offending frame and keep reading.
async fn run_peer<C: FrameCodec>(
    peer: Arc<TcpPeer>,
    stream: TcpStream,
    mut command_rx: mpsc::UnboundedReceiver<PeerCommand>,
    shared: ConnShared<C>,
) {
    let addr = peer.remote_addr();
    let (read_half, write_half) = stream.into_split();
    let mut frames = FramedRead::new(read_half, shared.codec.clone());
    let mut sink = FramedWrite::new(write_half, shared.codec.clone());

    let reason = loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(PeerCommand::Send(payload)) => {
                    if let Err(e) = sink.send(payload).await {
                        tracing::debug!(addr = %addr, error = %e, "Write failed");
                        break DisconnectReason::Io(e.to_string());
                    }
                }
                Some(PeerCommand::Disconnect) | None => {
                    break DisconnectReason::Requested;
                }
            },

            frame = frames.next() => match frame {
                Some(Ok(payload)) => {
                    if let Some(tx) = &shared.envelope_tx {
                        if tx.send(Envelope::new(addr, payload)).await.is_err() {
                            break DisconnectReason::ReceiverDropped;
                        }
                    } else {
                        tracing::trace!(addr = %addr, "No envelope receiver; frame dropped");
                    }
                }
                Some(Err(e)) if e.is_fatal() => {
                    tracing::debug!(addr = %addr, error = %e, "Read failed");
                    break DisconnectReason::Io(e.to_string());
                }
                Some(Err(e)) => {
                    // Transient: the codec resumes at the next frame boundary.
                    tracing::debug!(addr = %addr, error = %e, "Skipping frame");
                    shared.emit(TransportEvent::FrameSkipped {
                        addr,
                        reason: e.to_string(),
                    });
                }
                None => {
                    break DisconnectReason::StreamEnded;
                }
            },
        }
    };

    peer.mark_closed();
    shared.registry.remove(&addr).await;
    shared.emit(TransportEvent::PeerDisconnected {
        addr,
        reason: reason.clone(),
    });

    tracing::debug!(addr = %addr, reason = %reason, "Peer disconnected");
}
