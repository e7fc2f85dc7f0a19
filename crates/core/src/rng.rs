//! RNG module - 7-bag random piece generation
//!
//! Each bag contains one of each standard tetromino, shuffled, and is drawn
//! until empty before a new bag is generated. The same LCG also drives item
//! selection and the heuristic opponent's decision jitter, so a seed fully
//! determines a game.

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // High bits of an LCG are far better distributed than the low ones.
        (self.next_u32() >> 8) % max
    }

    /// Generate random value in the inclusive range [lo, hi]
    pub fn next_between(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_range(hi - lo + 1)
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// 7-bag piece generator
#[derive(Debug, Clone)]
pub struct PieceQueue {
    bag: [PieceKind; 7],
    bag_index: usize,
    rng: SimpleRng,
    seed: u32,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        let mut queue = Self {
            bag: PieceKind::STANDARD,
            bag_index: 0,
            rng: SimpleRng::new(seed),
            seed,
        };
        queue.refill_bag();
        queue
    }

    fn refill_bag(&mut self) {
        self.bag = PieceKind::STANDARD;
        self.rng.shuffle(&mut self.bag);
        self.bag_index = 0;
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        if self.bag_index >= self.bag.len() {
            self.refill_bag();
        }

        let piece = self.bag[self.bag_index];
        self.bag_index += 1;
        piece
    }

    /// Seed the queue was created with (for restarting with the same sequence)
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Remaining pieces of the current bag
    #[cfg(test)]
    fn current_bag(&self) -> &[PieceKind] {
        &self.bag[self.bag_index..]
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_range_bounds() {
        let mut rng = SimpleRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_between(500, 1000);
            assert!((500..=1000).contains(&v));
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_piece_queue_initial() {
        let queue = PieceQueue::new(1);
        assert_eq!(queue.current_bag().len(), 7);
    }

    #[test]
    fn test_piece_queue_draws_all_seven() {
        let mut queue = PieceQueue::new(1);

        let drawn: Vec<PieceKind> = (0..7).map(|_| queue.draw()).collect();
        for kind in PieceKind::STANDARD {
            assert!(drawn.contains(&kind), "Missing piece: {:?}", kind);
        }
        assert!(!drawn.contains(&PieceKind::Weight));
    }

    #[test]
    fn test_piece_queue_auto_refill() {
        let mut queue = PieceQueue::new(1);
        for _ in 0..7 {
            queue.draw();
        }
        assert!(queue.current_bag().is_empty());
        let _eighth = queue.draw();
        assert_eq!(queue.current_bag().len(), 6);
    }
}
