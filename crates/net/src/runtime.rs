//! Session runtime integration.
//!
//! Bridges the sync game loop with the async session.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::config::SessionConfig;
use crate::core::{AttackQueue, GameSnapshot};
use crate::duel::PeerLink;
use crate::protocol::Message;
use crate::session::{Role, Session, SessionEvent};

/// Running session plus the runtime that drives it
pub struct NetLink {
    // Dropped before the runtime so the goodbye is queued while tasks still run.
    session: Session,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    _rt: Runtime,
}

impl NetLink {
    /// Bind, wait for one peer and complete the handshake
    ///
    /// `ready_tx` receives the bound address before the accept blocks.
    pub fn host(
        config: &SessionConfig,
        attacks: AttackQueue,
        ready_tx: Option<oneshot::Sender<SocketAddr>>,
    ) -> anyhow::Result<Self> {
        let rt = Runtime::new()?;
        let (session, events) = rt.block_on(Session::host(config, attacks, ready_tx))?;
        Ok(Self {
            session,
            events,
            _rt: rt,
        })
    }

    /// Connect to a host and complete the handshake
    pub fn connect(config: &SessionConfig, attacks: AttackQueue) -> anyhow::Result<Self> {
        let rt = Runtime::new()?;
        let (session, events) = rt.block_on(Session::connect(config, attacks))?;
        Ok(Self {
            session,
            events,
            _rt: rt,
        })
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn peer_name(&self) -> &str {
        self.session.peer_name()
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Block the calling thread until the next event
    ///
    /// Returns `None` once the session has stopped producing events. Must not
    /// be called from inside an async context.
    pub fn recv(&mut self) -> Option<SessionEvent> {
        self.events.blocking_recv()
    }

    pub fn send(&self, message: Message) {
        self.session.send(message);
    }

    pub fn send_state(&mut self, snapshot: &GameSnapshot) -> bool {
        self.session.send_state(snapshot)
    }

    pub fn remote_snapshot(&self) -> Option<GameSnapshot> {
        self.session.remote_snapshot()
    }

    pub fn last_rtt(&self) -> Option<Duration> {
        self.session.last_rtt()
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    pub fn close(&self) {
        self.session.close();
    }
}

impl PeerLink for NetLink {
    fn send(&mut self, message: Message) {
        NetLink::send(self, message);
    }

    fn send_state(&mut self, snapshot: &GameSnapshot) -> bool {
        NetLink::send_state(self, snapshot)
    }

    fn poll_event(&mut self) -> Option<SessionEvent> {
        self.try_recv()
    }

    fn next_event(&mut self) -> Option<SessionEvent> {
        self.recv()
    }

    fn remote_snapshot(&self) -> Option<GameSnapshot> {
        NetLink::remote_snapshot(self)
    }

    fn close(&mut self) {
        NetLink::close(self);
    }
}
