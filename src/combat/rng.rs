//! Randomness for counterattack draws and question shuffles. Uses SplitMix64 for throughput
//! and good statistical quality. Deterministic: same seed produces the same sequence.
//! Not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// Source of random numbers injected into the factory and resolvers.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn below(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        // Lemire's multiply-shift; bias is negligible for table-sized ranges.
        ((u128::from(self.next_u64()) * len as u128) >> 64) as usize
    }

    /// Fisher–Yates shuffle in place.
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }

    /// Bernoulli draw with probability `p` (clamped to [0, 1]).
    fn chance(&mut self, p: f64) -> bool {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        unit < p.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds from the operating system. Falls back to the wall clock when the OS source is
    /// unavailable.
    pub fn from_entropy() -> Self {
        let mut buf = [0u8; 8];
        let seed = match getrandom::getrandom(&mut buf) {
            Ok(()) => u64::from_le_bytes(buf),
            Err(err) => {
                tracing::warn!("os entropy unavailable ({err}), seeding from clock");
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
            }
        };
        Self::new(seed)
    }

    /// Derives an independent stream, e.g. one per simulated team.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}

impl RandomSource for Rng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }
}
