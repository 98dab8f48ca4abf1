//! Host environment: wall clock and entropy.
//!
//! The store never reads time or randomness directly, so the browser
//! bridge can plug in `Date.now()`/`Math.random()` and tests can pin both.

use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Env {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// A sample in `[0, 1)`.
    fn random_unit(&self) -> f64;
}

/// Native environment backed by `SystemTime` and a randomly-seeded hasher.
#[derive(Default)]
pub struct SystemEnv {
    state: RandomState,
    draws: Cell<u64>,
}

impl Env for SystemEnv {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn random_unit(&self) -> f64 {
        let n = self.draws.get();
        self.draws.set(n.wrapping_add(1));
        let mut hasher = self.state.build_hasher();
        hasher.write_u64(n);
        (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Deterministic environment: a manually advanced clock and a fixed
/// sequence of random samples (cycled).
#[derive(Debug)]
pub struct FixedEnv {
    now: Cell<i64>,
    samples: Vec<f64>,
    cursor: Cell<usize>,
}

impl FixedEnv {
    pub fn new(now_ms: i64) -> Self {
        Self::with_samples(now_ms, vec![0.0])
    }

    pub fn with_samples(now_ms: i64, samples: Vec<f64>) -> Self {
        Self {
            now: Cell::new(now_ms),
            samples,
            cursor: Cell::new(0),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Env for FixedEnv {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }

    fn random_unit(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let i = self.cursor.get();
        self.cursor.set((i + 1) % self.samples.len());
        self.samples[i]
    }
}

impl<E: Env + ?Sized> Env for &E {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }

    fn random_unit(&self) -> f64 {
        (**self).random_unit()
    }
}
