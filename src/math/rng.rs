//! Seedable standard-normal sources with deterministic sub-streams.
//!
//! Each Monte Carlo run first [`fork`](RandomNumberSource::fork)s the caller's
//! source, which advances it, and batch `k` of the run then draws from
//! sub-stream `k` of the fork. Equal seeds reproduce the same estimate whatever
//! the worker count; repeated runs on one source see fresh draws.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;

/// Injectable source of independent standard-normal variates.
pub trait RandomNumberSource: Send {
    /// Draws one `N(0, 1)` variate.
    fn next_standard_normal(&mut self) -> f64;

    /// Fills `out` with `N(0, 1)` variates.
    fn fill_standard_normal(&mut self, out: &mut [f64]) {
        for z in out {
            *z = self.next_standard_normal();
        }
    }

    /// Child source seeded from this source's next output. Advances `self`.
    fn fork(&mut self) -> Self
    where
        Self: Sized;

    /// Independent, reproducible stream number `index` derived from this source.
    fn substream(&self, index: u64) -> Self
    where
        Self: Sized;
}

/// Underlying uniform generator of a [`SeededNormalRng`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    #[default]
    Xoshiro256PlusPlus,
    StdRng,
}

#[derive(Debug, Clone)]
pub struct Xoshiro256PlusPlus {
    state: [u64; 4],
}

impl Xoshiro256PlusPlus {
    #[inline]
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64::new(seed);
        let mut state = [0_u64; 4];
        for item in &mut state {
            *item = sm.next_u64();
        }

        if state.iter().all(|&x| x == 0) {
            state[0] = 1;
        }

        Self { state }
    }

    #[inline]
    fn step(&mut self) -> u64 {
        let result = (self.state[0].wrapping_add(self.state[3]))
            .rotate_left(23)
            .wrapping_add(self.state[0]);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);

        result
    }
}

impl RngCore for Xoshiro256PlusPlus {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Generator {
    Xoshiro(Xoshiro256PlusPlus),
    Std(StdRng),
}

/// Seeded normal source backed by Xoshiro256++ (default) or rand's `StdRng`.
///
/// # Examples
/// ```
/// use ferric_options::math::rng::{RandomNumberSource, SeededNormalRng};
///
/// let mut a = SeededNormalRng::new(7);
/// let mut b = SeededNormalRng::new(7);
/// assert_eq!(a.next_standard_normal(), b.next_standard_normal());
/// ```
#[derive(Debug, Clone)]
pub struct SeededNormalRng {
    kind: GeneratorKind,
    seed: u64,
    inner: Generator,
}

impl SeededNormalRng {
    /// Xoshiro256++ source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_kind(GeneratorKind::default(), seed)
    }

    pub fn with_kind(kind: GeneratorKind, seed: u64) -> Self {
        let inner = match kind {
            GeneratorKind::Xoshiro256PlusPlus => {
                Generator::Xoshiro(Xoshiro256PlusPlus::seed_from_u64(seed))
            }
            GeneratorKind::StdRng => Generator::Std(StdRng::seed_from_u64(seed)),
        };
        Self { kind, seed, inner }
    }

    /// Source seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }
}

impl Default for SeededNormalRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomNumberSource for SeededNormalRng {
    #[inline]
    fn next_standard_normal(&mut self) -> f64 {
        match &mut self.inner {
            Generator::Xoshiro(rng) => rng.sample(StandardNormal),
            Generator::Std(rng) => rng.sample(StandardNormal),
        }
    }

    fn fill_standard_normal(&mut self, out: &mut [f64]) {
        match &mut self.inner {
            Generator::Xoshiro(rng) => out.iter_mut().for_each(|z| *z = rng.sample(StandardNormal)),
            Generator::Std(rng) => out.iter_mut().for_each(|z| *z = rng.sample(StandardNormal)),
        }
    }

    fn fork(&mut self) -> Self {
        let seed = match &mut self.inner {
            Generator::Xoshiro(rng) => rng.next_u64(),
            Generator::Std(rng) => rng.next_u64(),
        };
        Self::with_kind(self.kind, seed)
    }

    fn substream(&self, index: u64) -> Self {
        Self::with_kind(self.kind, stream_seed(self.seed, index))
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    #[inline]
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(Self::GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Seed of sub-stream `stream_index`: the `stream_index + 1`-th SplitMix64 output of `base_seed`.
#[inline]
pub fn stream_seed(base_seed: u64, stream_index: u64) -> u64 {
    SplitMix64::new(base_seed.wrapping_add(stream_index.wrapping_mul(SplitMix64::GOLDEN_GAMMA)))
        .next_u64()
}
