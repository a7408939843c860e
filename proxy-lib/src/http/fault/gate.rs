use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;
use rand::{Rng as _, SeedableRng as _};

/// Exclusive upper bound of a percentage draw.
pub const PERCENTAGE_DRAW_BOUND: i64 = 100;

/// Source of uniformly distributed integers in `[0, 100)`,
/// shared by all requests handled by a fault injector.
pub trait PercentageSource: fmt::Debug + Send + Sync + 'static {
    fn draw(&self) -> i64;
}

/// Decide if a fault with the given (effective) percentage fires.
///
/// Fires when the draw is less than or equal to `percentage`,
/// meaning that a percentage of `0` still fires for a draw of `0`
/// and only negative percentages never fire.
pub fn fault_should_run(source: &dyn PercentageSource, percentage: i64) -> bool {
    source.draw() <= percentage
}

/// Default [`PercentageSource`] which uses the thread local rng.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ThreadRngSource;

impl ThreadRngSource {
    #[inline(always)]
    pub fn new() -> Self {
        Self
    }
}

impl PercentageSource for ThreadRngSource {
    fn draw(&self) -> i64 {
        rand::random_range(0..PERCENTAGE_DRAW_BOUND)
    }
}

/// Reproducible [`PercentageSource`] driven by a seeded rng.
pub struct SeededSource {
    rng: Mutex<rand::rngs::SmallRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(rand::rngs::SmallRng::seed_from_u64(seed)),
        }
    }
}

impl fmt::Debug for SeededSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededSource").finish()
    }
}

impl PercentageSource for SeededSource {
    fn draw(&self) -> i64 {
        self.rng.lock().random_range(0..PERCENTAGE_DRAW_BOUND)
    }
}

/// [`PercentageSource`] cycling through a fixed sequence of draws.
///
/// Values are returned as given, they are not clamped to `[0, 100)`.
/// An empty sequence always draws `0`.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    draws: Arc<[i64]>,
    cursor: Arc<AtomicUsize>,
}

impl SequenceSource {
    pub fn new(draws: impl Into<Arc<[i64]>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: Default::default(),
        }
    }

    /// Always draw the same value.
    pub fn constant(draw: i64) -> Self {
        Self::new(vec![draw])
    }

    /// Amount of draws made so far.
    pub fn draw_count(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl PercentageSource for SequenceSource {
    fn draw(&self) -> i64 {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        if self.draws.is_empty() {
            return 0;
        }
        self.draws[index % self.draws.len()]
    }
}
