//! Small deterministic PRNG used for transaction identifiers and timer jitter.

/// sPCG32 generator. Seeded once per monitor; never used for anything
/// security sensitive.
#[derive(Debug, Clone)]
pub struct Rand {
    state: u64,
}

impl Rand {
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn rand_u32(&mut self) -> u32 {
        // sPCG32 from https://www.pcg-random.org/paper.html
        // see also https://nullprogram.com/blog/2017/09/21/
        const M: u64 = 0xbb2efcec3c39611d;
        const A: u64 = 0x7590ef39;

        let s = self.state.wrapping_mul(M).wrapping_add(A);
        self.state = s;

        let shift = 29 - (s >> 61);
        (s >> shift) as u32
    }

    /// Uniform value in `low..=high`. Returns `low` when the range is empty.
    pub fn rand_range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64 + 1;
        low + (self.rand_u32() as u64 % span) as u32
    }

    /// Uniform offset in `-spread..=spread` milliseconds.
    pub fn jitter_millis(&mut self, spread: u32) -> i64 {
        self.rand_range(0, spread.saturating_mul(2)) as i64 - spread as i64
    }
}
