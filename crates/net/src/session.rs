//! Duplex session between exactly two peers
//!
//! One side binds and accepts ([`Session::host`]), the other connects
//! ([`Session::connect`]). The connecting side sends `hello` and waits for
//! `hello_ack` before either side starts its loops, so neither depends on the
//! other's timing.
//!
//! After the handshake three tasks run per peer:
//!
//! - **writer**: the single serialized send path; every outbound message goes
//!   through one channel so lines never interleave
//! - **reader**: decodes inbound lines, answers pings, stores the latest
//!   remote snapshot and pushes inbound attacks into the local attack queue
//! - **pinger**: sends a `ping` carrying the send time every `ping_interval`
//!
//! Everything the simulation needs is delivered as [`SessionEvent`]s over an
//! unbounded channel. Closing is idempotent and unblocks all three tasks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::core::{unix_ms, AttackQueue, GameSnapshot};
use crate::error::{NetError, Result};
use crate::protocol::{decode, encode, Hello, HelloAck, Message, NetworkMessage};
use crate::throttle::{snapshot_fingerprint, StateThrottle};
use crate::types::{BOARD_WIDTH, MAX_ATTACK_LINES};

/// Notification delivered to the simulation side
#[derive(Debug)]
pub enum SessionEvent {
    /// Any inbound message except ping/pong
    Message(NetworkMessage),
    /// Round trip measured from one of our pings
    Rtt(Duration),
    /// Peer closed the stream, reset it or said `disconnect`
    Disconnected,
    /// Fatal failure; the session is closed
    Error(NetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Host,
    Client,
}

/// Latest snapshot received from the peer
type SharedSnapshot = Arc<Mutex<Option<GameSnapshot>>>;

fn lock_snapshot(shared: &SharedSnapshot) -> MutexGuard<'_, Option<GameSnapshot>> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

const NO_RTT: u64 = u64::MAX;

/// A running session
pub struct Session {
    role: Role,
    peer_addr: SocketAddr,
    peer_name: String,
    out_tx: mpsc::UnboundedSender<NetworkMessage>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    closed: Arc<AtomicBool>,
    remote: SharedSnapshot,
    last_rtt_ms: Arc<AtomicU64>,
    throttle: StateThrottle,
    started: Instant,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Bind, accept exactly one peer and run the accepting half of the handshake
    ///
    /// `ready_tx` receives the bound address before the accept blocks.
    pub async fn host(
        config: &SessionConfig,
        attacks: AttackQueue,
        ready_tx: Option<oneshot::Sender<SocketAddr>>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?;
        info!(%bound, "waiting for peer");
        if let Some(tx) = ready_tx {
            let _ = tx.send(bound);
        }

        let (stream, peer_addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();

        let hello: Hello = match read_message(&mut reader, &mut line).await? {
            Some(NetworkMessage {
                message: Message::Hello(hello),
                ..
            }) => hello,
            Some(other) => {
                let reason = format!("expected hello, got {}", other.message.kind());
                let _ = write_line(
                    &mut write_half,
                    &NetworkMessage::now(Message::error("handshake", reason.as_str())),
                )
                .await;
                return Err(NetError::Handshake(reason));
            }
            None => return Err(NetError::Handshake("peer closed before hello".to_string())),
        };

        if !hello.is_compatible_with(&config.protocol_version) {
            let reason = format!(
                "protocol version {} not supported (local {})",
                hello.protocol_version, config.protocol_version
            );
            let _ = write_line(
                &mut write_half,
                &NetworkMessage::now(Message::error("protocol_mismatch", reason.as_str())),
            )
            .await;
            return Err(NetError::Handshake(reason));
        }

        let ack = Message::HelloAck(HelloAck {
            player_name: config.player_name.clone(),
            protocol_version: config.protocol_version.clone(),
        });
        write_line(&mut write_half, &NetworkMessage::now(ack)).await?;
        info!(%peer_addr, peer = %hello.player_name, "peer connected");

        Ok(Self::spawn(
            Role::Host,
            config,
            reader,
            write_half,
            peer_addr,
            hello.player_name,
            attacks,
        ))
    }

    /// Connect to a hosting peer and run the connecting half of the handshake
    pub async fn connect(
        config: &SessionConfig,
        attacks: AttackQueue,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let addr = config.socket_addr()?;
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();

        let hello = Message::Hello(Hello {
            player_name: config.player_name.clone(),
            protocol_version: config.protocol_version.clone(),
        });
        write_line(&mut write_half, &NetworkMessage::now(hello)).await?;

        let ack = match read_message(&mut reader, &mut line).await? {
            Some(NetworkMessage {
                message: Message::HelloAck(ack),
                ..
            }) => ack,
            Some(NetworkMessage {
                message: Message::Error(err),
                ..
            }) => return Err(NetError::Handshake(err.message)),
            Some(other) => {
                return Err(NetError::Handshake(format!(
                    "expected hello_ack, got {}",
                    other.message.kind()
                )))
            }
            None => {
                return Err(NetError::Handshake(
                    "peer closed during handshake".to_string(),
                ))
            }
        };
        info!(%peer_addr, peer = %ack.player_name, "connected to host");

        Ok(Self::spawn(
            Role::Client,
            config,
            reader,
            write_half,
            peer_addr,
            ack.player_name,
            attacks,
        ))
    }

    fn spawn(
        role: Role,
        config: &SessionConfig,
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
        peer_addr: SocketAddr,
        peer_name: String,
        attacks: AttackQueue,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let closed = Arc::new(AtomicBool::new(false));
        let remote: SharedSnapshot = Arc::new(Mutex::new(None));
        let last_rtt_ms = Arc::new(AtomicU64::new(NO_RTT));

        let receiver = Receiver {
            reader,
            out_tx: out_tx.clone(),
            event_tx,
            remote: Arc::clone(&remote),
            attacks,
            closed: Arc::clone(&closed),
            shutdown_tx: Arc::clone(&shutdown_tx),
            last_rtt_ms: Arc::clone(&last_rtt_ms),
            max_transient_failures: config.max_transient_failures,
        };

        let tasks = vec![
            tokio::spawn(write_loop(writer, out_rx, shutdown_rx.clone())),
            tokio::spawn(receiver.run(shutdown_rx.clone())),
            tokio::spawn(ping_loop(out_tx.clone(), config.ping_interval, shutdown_rx)),
        ];

        let session = Self {
            role,
            peer_addr,
            peer_name,
            out_tx,
            shutdown_tx,
            closed,
            remote,
            last_rtt_ms,
            throttle: StateThrottle::new(config.state_interval.as_millis() as u64),
            started: Instant::now(),
            tasks,
        };
        (session, event_rx)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue a message for immediate delivery; a no-op once closed
    pub fn send(&self, message: Message) {
        if self.is_closed() {
            return;
        }
        let _ = self.out_tx.send(NetworkMessage::now(message));
    }

    /// Send a state update unless the throttle holds it back
    pub fn send_state(&mut self, snapshot: &GameSnapshot) -> bool {
        let now_ms = self.started.elapsed().as_millis() as u64;
        self.send_state_at(snapshot, now_ms)
    }

    /// Like [`send_state`](Self::send_state) with `now_ms` counted from
    /// session start
    pub fn send_state_at(&mut self, snapshot: &GameSnapshot, now_ms: u64) -> bool {
        if self.is_closed() {
            return false;
        }
        if !self
            .throttle
            .should_send(now_ms, snapshot_fingerprint(snapshot))
        {
            return false;
        }
        self.send(Message::StateUpdate(Box::new(snapshot.clone())));
        true
    }

    /// Latest snapshot received from the peer
    pub fn remote_snapshot(&self) -> Option<GameSnapshot> {
        lock_snapshot(&self.remote).clone()
    }

    /// Most recent round-trip time, if a pong has arrived
    pub fn last_rtt(&self) -> Option<Duration> {
        match self.last_rtt_ms.load(Ordering::Acquire) {
            NO_RTT => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Say goodbye and stop all tasks; safe to call repeatedly
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.out_tx.send(NetworkMessage::now(Message::Disconnect));
        self.shutdown_tx.send_replace(true);
        info!(peer = %self.peer_addr, "session closed");
    }

    /// Close and wait for every task to finish
    pub async fn shutdown(mut self) {
        self.close();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, msg: &NetworkMessage) -> Result<()> {
    let mut line = encode(msg)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Decode one raw line; `None` for a blank line
fn decode_line(line: &[u8]) -> Result<Option<NetworkMessage>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| NetError::Protocol(format!("line is not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    decode(trimmed).map(Some)
}

/// Read the next non-empty line; `None` on end of stream
async fn read_message(
    reader: &mut BufReader<OwnedReadHalf>,
    line: &mut Vec<u8>,
) -> Result<Option<NetworkMessage>> {
    loop {
        line.clear();
        if reader.read_until(b'\n', line).await? == 0 {
            return Ok(None);
        }
        if let Some(msg) = decode_line(line)? {
            return Ok(Some(msg));
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut out_rx: mpsc::UnboundedReceiver<NetworkMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            msg = out_rx.recv() => {
                let Some(msg) = msg else { break };
                if let Err(e) = write_line(&mut writer, &msg).await {
                    debug!(%e, kind = msg.message.kind(), "write failed");
                    break;
                }
            }
            _ = shutdown.changed() => {
                // Deliver what was queued before the close (the goodbye included).
                while let Ok(msg) = out_rx.try_recv() {
                    if write_line(&mut writer, &msg).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}

async fn ping_loop(
    out_tx: mpsc::UnboundedSender<NetworkMessage>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = unix_ms();
                if out_tx.send(NetworkMessage::new(Message::Ping(now), now)).is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}

/// State owned by the receive task
struct Receiver<R> {
    reader: R,
    out_tx: mpsc::UnboundedSender<NetworkMessage>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    remote: SharedSnapshot,
    attacks: AttackQueue,
    closed: Arc<AtomicBool>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    last_rtt_ms: Arc<AtomicU64>,
    max_transient_failures: u32,
}

impl<R: AsyncBufRead + Unpin> Receiver<R> {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut line = Vec::new();
        let mut failures = 0u32;

        loop {
            line.clear();
            let read = tokio::select! {
                r = self.reader.read_until(b'\n', &mut line) => r,
                _ = shutdown.changed() => break,
            };

            match read {
                Ok(0) => {
                    info!("peer closed the stream");
                    self.emit(SessionEvent::Disconnected);
                    break;
                }
                Ok(_) => {
                    failures = 0;
                    match decode_line(&line) {
                        Ok(Some(msg)) => {
                            if !self.dispatch(msg) {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(%e, "undecodable message from peer");
                            self.emit(SessionEvent::Error(e));
                            break;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    error!(%e, "undecodable bytes from peer");
                    self.emit(SessionEvent::Error(NetError::Protocol(e.to_string())));
                    break;
                }
                Err(e) if is_disconnect(&e) => {
                    info!(%e, "peer connection lost");
                    self.emit(SessionEvent::Disconnected);
                    break;
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.max_transient_failures {
                        error!(%e, failures, "giving up after repeated read failures");
                        self.emit(SessionEvent::Error(NetError::Connection(e)));
                        break;
                    }
                    warn!(%e, failures, "transient read failure, retrying");
                }
            }
        }

        // Nothing more can arrive; make further sends no-ops and stop the other loops.
        self.closed.store(true, Ordering::Release);
        self.shutdown_tx.send_replace(true);
    }

    /// Handle one inbound message; false ends the receive loop
    fn dispatch(&mut self, msg: NetworkMessage) -> bool {
        match &msg.message {
            Message::Ping(sent) => {
                let _ = self
                    .out_tx
                    .send(NetworkMessage::now(Message::Pong(*sent)));
                return true;
            }
            Message::Pong(sent) => {
                let rtt_ms = unix_ms().saturating_sub(*sent);
                self.last_rtt_ms.store(rtt_ms, Ordering::Release);
                self.emit(SessionEvent::Rtt(Duration::from_millis(rtt_ms)));
                return true;
            }
            Message::StateUpdate(snapshot) => {
                *lock_snapshot(&self.remote) = Some((**snapshot).clone());
            }
            Message::Attack(attack) => {
                if attack.gap_column >= BOARD_WIDTH {
                    let e = NetError::Protocol(format!(
                        "attack gap column {} outside the board",
                        attack.gap_column
                    ));
                    error!(%e, "rejecting attack");
                    self.emit(SessionEvent::Error(e));
                    return false;
                }
                // The board never holds more than MAX_ATTACK_LINES attack rows
                let rows = attack.rows.min(MAX_ATTACK_LINES as u32);
                self.attacks.push_rows(rows as usize, attack.gap_column);
                debug!(rows, claimed = attack.rows, gap_column = attack.gap_column, "attack received");
            }
            Message::Disconnect => {
                info!("peer said goodbye");
                self.emit(SessionEvent::Disconnected);
                return false;
            }
            _ => {}
        }
        self.emit(SessionEvent::Message(msg));
        true
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
