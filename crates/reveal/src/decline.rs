use rand::{rngs::StdRng, Rng, SeedableRng};

pub const MAX_OFFSET_X: f32 = 130.0;
pub const MAX_OFFSET_Y: f32 = 70.0;

/// Shown round-robin on each decline, indexed by the decline count so far.
pub const DISCOURAGEMENTS: [&str; 8] = [
    "Are you sure? 🥺",
    "Think again!",
    "Pretty please? 🙏",
    "Don't break my heart 💔",
    "That button seems broken...",
    "You're making me sad 😢",
    "Last chance!",
    "Wrong button, try the other one 💖",
];

pub fn discouragement_for(reject_count: u32) -> &'static str {
    DISCOURAGEMENTS[reject_count as usize % DISCOURAGEMENTS.len()]
}

/// Pixel displacement of the decline control from its resting position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub fn within_bounds(&self) -> bool {
        self.x.abs() <= MAX_OFFSET_X && self.y.abs() <= MAX_OFFSET_Y
    }
}

/// Picks where the decline control jumps to next.
pub struct EvasionPolicy {
    rng: StdRng,
}

impl EvasionPolicy {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_offset(&mut self) -> Offset {
        Offset {
            x: self.rng.gen_range(-MAX_OFFSET_X..=MAX_OFFSET_X),
            y: self.rng.gen_range(-MAX_OFFSET_Y..=MAX_OFFSET_Y),
        }
    }
}

impl Default for EvasionPolicy {
    fn default() -> Self {
        Self::from_entropy()
    }
}
