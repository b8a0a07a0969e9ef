//! Request-scoped generation state

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

/// Everything one generation request needs that would otherwise be ambient:
/// the clock, the caller's UTC offset, a nonce for the backend, and the RNG
/// used by the fallback synthesizer.
#[derive(Debug)]
pub struct GenerationContext {
    now: DateTime<FixedOffset>,
    nonce: Uuid,
    rng: StdRng,
}

impl GenerationContext {
    /// Context for the current local time with an OS-seeded RNG
    pub fn new() -> Self {
        Self {
            now: Local::now().fixed_offset(),
            nonce: Uuid::new_v4(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Context pinned to a clock and seed, for reproducible runs
    pub fn with_clock(now: DateTime<FixedOffset>, seed: u64) -> Self {
        Self {
            now,
            nonce: Uuid::new_v4(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Local calendar date of `now`
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn offset(&self) -> FixedOffset {
        *self.now.offset()
    }

    pub fn nonce(&self) -> Uuid {
        self.nonce
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new()
    }
}
