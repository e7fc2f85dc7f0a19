use std::hash::{Hash, Hasher};

use crate::core::GameSnapshot;

/// Stable 64-bit FNV-1a hasher for snapshot fingerprints.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Fingerprint of everything visible in a snapshot except its capture time
pub fn snapshot_fingerprint(s: &GameSnapshot) -> u64 {
    let mut h = Fnv1aHasher::new();
    s.board.hash(&mut h);
    s.items.hash(&mut h);
    s.score.hash(&mut h);
    s.level.hash(&mut h);
    s.lines.hash(&mut h);
    s.current.hash(&mut h);
    s.next.hash(&mut h);
    s.pending_attacks.hash(&mut h);
    s.game_over.hash(&mut h);
    h.finish()
}

/// Rate limiter for outbound state updates
///
/// Never sends more than once per `min_interval_ms`. Between those slots a
/// snapshot goes out only if it differs from the last one sent, or if
/// `idle_interval_ms` has passed so the peer still sees a heartbeat of state.
#[derive(Debug, Clone)]
pub struct StateThrottle {
    min_interval_ms: u64,
    idle_interval_ms: u64,
    last_sent_ms: u64,
    last_fingerprint: u64,
    has_sent: bool,
}

impl StateThrottle {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            idle_interval_ms: min_interval_ms.saturating_mul(20),
            last_sent_ms: 0,
            last_fingerprint: 0,
            has_sent: false,
        }
    }

    /// Decide whether to send a state update now
    pub fn should_send(&mut self, now_ms: u64, fingerprint: u64) -> bool {
        if !self.has_sent {
            self.has_sent = true;
            self.last_sent_ms = now_ms;
            self.last_fingerprint = fingerprint;
            return true;
        }

        let elapsed = now_ms.saturating_sub(self.last_sent_ms);
        if elapsed < self.min_interval_ms {
            return false;
        }

        if fingerprint != self.last_fingerprint || elapsed >= self.idle_interval_ms {
            self.last_sent_ms = now_ms;
            self.last_fingerprint = fingerprint;
            return true;
        }

        false
    }

}
