//! Local engine versus a remote peer
//!
//! [`RemoteDuel`] is the networked counterpart of the local battle
//! coordinator. It owns only the local engine; the opponent exists as the
//! latest replicated snapshot. Multi-row clears go out as `attack` messages,
//! inbound attacks land in the engine's queue via the session and drain at
//! the next placement.
//!
//! Results use the battle [`Winner`] with the local seat as
//! [`PlayerId::One`] and the peer as [`PlayerId::Two`].

use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::battle::{PlayerId, Winner};
use crate::core::{AttackQueue, Engine, EngineConfig, GameSnapshot};
use crate::error::{NetError, Result};
use crate::protocol::{
    AttackPayload, GameModePayload, GameOverPayload, GameStartPayload, MatchOutcome,
    MatchResultPayload, Message, ReadyPayload, TimeSyncPayload,
};
use crate::session::{Role, SessionEvent};
use crate::types::{Action, Settings};

/// How often the host shares its view of the remaining match time
const TIME_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// The duel's view of a connected peer
pub trait PeerLink {
    /// Send immediately, bypassing the state throttle
    fn send(&mut self, message: Message);
    /// Offer a state update to the throttle; true if it went out
    fn send_state(&mut self, snapshot: &GameSnapshot) -> bool;
    /// Next pending session event, without blocking
    fn poll_event(&mut self) -> Option<SessionEvent>;
    /// Block until the next session event; `None` once no more can arrive
    fn next_event(&mut self) -> Option<SessionEvent>;
    /// Latest snapshot replicated from the peer
    fn remote_snapshot(&self) -> Option<GameSnapshot>;
    fn close(&mut self);
}

/// Rematch negotiation after a finished duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rematch {
    #[default]
    None,
    /// We asked, waiting for the peer
    Requested,
    /// The peer asked, waiting for our answer
    Offered,
    Accepted,
    Declined,
}

/// One local engine playing against a remote peer
pub struct RemoteDuel<L: PeerLink> {
    role: Role,
    engine: Engine,
    link: L,
    winner: Winner,
    running: bool,
    paused: bool,
    remote_over: bool,
    topped_out: bool,
    time_limit: Option<Duration>,
    deadline: Option<Instant>,
    paused_at: Option<Instant>,
    last_time_sync: Option<Instant>,
    last_rtt: Option<Duration>,
    rematch: Rematch,
}

impl<L: PeerLink> RemoteDuel<L> {
    /// `attacks` must be the queue the session pushes inbound attacks into
    pub fn new(role: Role, settings: &Settings, seed: u32, attacks: AttackQueue, link: L) -> Self {
        Self {
            role,
            engine: Engine::new(EngineConfig::from_settings(settings, seed), attacks),
            link,
            winner: Winner::None,
            running: false,
            paused: false,
            remote_over: false,
            topped_out: false,
            time_limit: settings.time_limit(),
            deadline: None,
            paused_at: None,
            last_time_sync: None,
            last_rtt: None,
            rematch: Rematch::None,
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.engine.start();
        self.winner = Winner::None;
        self.running = true;
        self.paused = false;
        self.remote_over = false;
        self.topped_out = false;
        self.paused_at = None;
        self.last_time_sync = None;
        self.rematch = Rematch::None;
        self.deadline = self.time_limit.map(|limit| now + limit);
        info!(role = ?self.role, "duel started");
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[doc(hidden)]
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }

    pub fn remote_snapshot(&self) -> Option<GameSnapshot> {
        self.link.remote_snapshot()
    }

    pub fn rematch(&self) -> Rematch {
        self.rematch
    }

    /// Ask the peer for another match; accepts a pending offer instead
    pub fn request_rematch(&mut self) {
        match self.rematch {
            _ if self.running => {}
            Rematch::Offered => self.answer_rematch(true),
            Rematch::None | Rematch::Declined => {
                self.rematch = Rematch::Requested;
                self.link.send(Message::RematchRequest);
            }
            Rematch::Requested | Rematch::Accepted => {}
        }
    }

    /// Answer a rematch offered by the peer
    pub fn answer_rematch(&mut self, accept: bool) {
        if self.rematch != Rematch::Offered {
            return;
        }
        if accept {
            self.rematch = Rematch::Accepted;
            self.link.send(Message::RematchAccept);
        } else {
            self.rematch = Rematch::Declined;
            self.link.send(Message::RematchDecline);
        }
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.remaining_time_at(Instant::now())
    }

    pub fn remaining_time_at(&self, now: Instant) -> Option<Duration> {
        let deadline = self.deadline?;
        let at = self.paused_at.unwrap_or(now);
        Some(deadline.saturating_duration_since(at))
    }

    /// Apply one local input; false if the match is not live or the move was rejected
    pub fn apply_input(&mut self, action: Action) -> bool {
        if !self.running || self.paused {
            return false;
        }
        let changed = self.engine.apply_action(action);
        self.after_engine_step();
        changed
    }

    /// Toggle pause locally and tell the peer
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        let paused = !self.paused;
        self.set_paused(paused, now);
        self.link
            .send(if paused { Message::Pause } else { Message::Resume });
    }

    /// Drain session events, advance the engine and replicate state
    pub fn tick(&mut self, elapsed_ms: u32) -> Winner {
        self.tick_at(elapsed_ms, Instant::now())
    }

    pub fn tick_at(&mut self, elapsed_ms: u32, now: Instant) -> Winner {
        self.poll_events(now);

        if self.running && !self.paused {
            self.engine.tick(elapsed_ms);
            self.after_engine_step();
        }
        if self.running {
            self.check_deadline(now);
        }
        if self.running {
            self.sync_time(now);
            let snapshot = self.engine.snapshot();
            self.link.send_state(&snapshot);
        }
        self.winner
    }

    /// Say goodbye to the peer
    pub fn close(&mut self) {
        self.link.close();
    }

    fn set_paused(&mut self, paused: bool, now: Instant) {
        if paused == self.paused {
            return;
        }
        if paused {
            self.paused_at = Some(now);
        } else if let (Some(at), Some(deadline)) = (self.paused_at.take(), self.deadline) {
            self.deadline = Some(deadline + now.saturating_duration_since(at));
        }
        self.paused = paused;
        self.engine.pause();
        debug!(paused, "duel pause toggled");
    }

    fn poll_events(&mut self, now: Instant) {
        while let Some(event) = self.link.poll_event() {
            match event {
                SessionEvent::Rtt(rtt) => self.last_rtt = Some(rtt),
                SessionEvent::Message(msg) => self.handle_message(msg.message, now),
                SessionEvent::Disconnected => {
                    if self.running {
                        info!("peer disconnected mid-match");
                        self.finish(Winner::Player(PlayerId::One));
                    }
                }
                SessionEvent::Error(e) => {
                    error!(%e, "session failed");
                    if self.running {
                        self.running = false;
                        self.engine.stop();
                    }
                }
            }
        }
    }

    fn handle_message(&mut self, message: Message, now: Instant) {
        match message {
            Message::GameOver(GameOverPayload { is_game_over: true }) => {
                self.remote_over = true;
                if self.running {
                    self.finish(Winner::Player(PlayerId::One));
                }
            }
            Message::Pause if self.running => self.set_paused(true, now),
            Message::Resume if self.running => self.set_paused(false, now),
            Message::TimeSync(TimeSyncPayload { remaining_ms }) => {
                if self.role == Role::Client && self.deadline.is_some() {
                    let at = self.paused_at.unwrap_or(now);
                    self.deadline = Some(at + Duration::from_millis(remaining_ms));
                }
            }
            Message::RematchRequest if !self.running => {
                // Both asked at once: that is an agreement
                self.rematch = match self.rematch {
                    Rematch::Requested => Rematch::Accepted,
                    _ => Rematch::Offered,
                };
            }
            Message::RematchAccept if self.rematch == Rematch::Requested => {
                self.rematch = Rematch::Accepted;
            }
            Message::RematchDecline => self.rematch = Rematch::Declined,
            Message::MatchResult(result) => {
                debug!(outcome = ?result.outcome, score = result.score, "peer reported result");
                // A game_over from the peer after our own top-out means both
                // sides topped out before hearing from each other
                if self.topped_out && self.remote_over && !self.running {
                    self.winner = Winner::by_score(self.engine.score(), result.score);
                    info!(winner = ?self.winner, "both topped out, decided by score");
                }
            }
            _ => {}
        }
    }

    fn after_engine_step(&mut self) {
        if let Some(placement) = self.engine.take_last_placement() {
            if placement.lines_cleared >= 2 {
                debug!(
                    rows = placement.lines_cleared,
                    gap_column = placement.gap_column,
                    "attack sent"
                );
                self.link.send(Message::Attack(AttackPayload {
                    rows: placement.lines_cleared,
                    gap_column: placement.gap_column,
                }));
            }
        }

        if self.running && (self.engine.is_stopped() || !self.engine.current_fits()) {
            self.link.send(Message::GameOver(GameOverPayload { is_game_over: true }));
            self.topped_out = true;
            self.finish(Winner::Player(PlayerId::Two));
        }
    }

    fn check_deadline(&mut self, now: Instant) {
        if self.paused {
            return;
        }
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            info!("time limit reached");
            let winner = Winner::by_score(self.engine.score(), self.remote_score());
            self.finish(winner);
        }
    }

    fn sync_time(&mut self, now: Instant) {
        if self.role != Role::Host {
            return;
        }
        let Some(remaining) = self.remaining_time_at(now) else {
            return;
        };
        if self
            .last_time_sync
            .is_some_and(|at| now.saturating_duration_since(at) < TIME_SYNC_INTERVAL)
        {
            return;
        }
        self.last_time_sync = Some(now);
        self.link.send(Message::TimeSync(TimeSyncPayload {
            remaining_ms: remaining.as_millis() as u64,
        }));
    }

    fn remote_score(&self) -> u32 {
        self.link.remote_snapshot().map_or(0, |s| s.score)
    }

    fn finish(&mut self, winner: Winner) {
        self.winner = winner;
        self.running = false;
        self.engine.stop();

        let score = self.engine.score();
        let opponent_score = self.remote_score();
        let outcome = match winner {
            Winner::Player(PlayerId::One) => MatchOutcome::Win,
            Winner::Player(PlayerId::Two) => MatchOutcome::Lose,
            Winner::Draw | Winner::None => MatchOutcome::Draw,
        };
        self.link.send(Message::MatchResult(MatchResultPayload {
            outcome,
            score,
            opponent_score,
        }));
        info!(?outcome, score, opponent_score, "duel finished");
    }
}

/// Host side of match setup: propose the rules and the peer's piece seed
pub fn announce_match<L: PeerLink>(link: &mut L, settings: &Settings, peer_seed: u32) {
    link.send(Message::GameMode(GameModePayload {
        mode: settings.game_mode,
        difficulty: settings.difficulty,
        time_limit_secs: settings.time_limit_secs,
    }));
    link.send(Message::GameStart(GameStartPayload { seed: peer_seed }));
}

/// Joining side of match setup: block until `game_start`, then answer `ready`
///
/// Returns the settings proposed by the host (keys stay local) and the seed
/// for the local engine.
pub fn await_match<L: PeerLink>(link: &mut L, local: &Settings) -> Result<(Settings, u32)> {
    let mut settings = local.clone();
    while let Some(event) = link.next_event() {
        match event {
            SessionEvent::Message(msg) => match msg.message {
                Message::GameMode(mode) => {
                    settings.game_mode = mode.mode;
                    settings.difficulty = mode.difficulty;
                    settings.time_limit_secs = mode.time_limit_secs;
                }
                Message::GameStart(GameStartPayload { seed }) => {
                    link.send(Message::Ready(ReadyPayload { ready: true }));
                    return Ok((settings, seed));
                }
                Message::Error(err) => return Err(NetError::Handshake(err.message)),
                _ => {}
            },
            SessionEvent::Disconnected => return Err(NetError::Closed),
            SessionEvent::Error(e) => return Err(e),
            SessionEvent::Rtt(_) => {}
        }
    }
    Err(NetError::Closed)
}

/// Host side: block until the peer reports `ready`
pub fn await_ready<L: PeerLink>(link: &mut L) -> Result<()> {
    while let Some(event) = link.next_event() {
        match event {
            SessionEvent::Message(msg) => match msg.message {
                Message::Ready(ReadyPayload { ready: true }) => return Ok(()),
                Message::Error(err) => return Err(NetError::Handshake(err.message)),
                _ => {}
            },
            SessionEvent::Disconnected => return Err(NetError::Closed),
            SessionEvent::Error(e) => return Err(e),
            SessionEvent::Rtt(_) => {}
        }
    }
    Err(NetError::Closed)
}
