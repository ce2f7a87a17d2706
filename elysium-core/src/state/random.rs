/// Seedable linear congruential generator for probability gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 33) as u32
    }

    /// Uniform-ish integer in `0..100`.
    pub fn next_percent(&mut self) -> u32 {
        self.next_u32() % 100
    }
}
