// Minimal seeded PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It exists so that every trial's menu arrangement is fair *and* replayable:
// two generators built from the same seed must produce bit-identical output
// forever, on every platform.

/// mulberry32 generator over a 32-bit state.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next float in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(t | 1);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(r | 61));
        ((r ^ (r >> 14)) as f64) / 4_294_967_296.0
    }

    #[inline]
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// In-place Fisher–Yates: walk `i` from the top down, draw
/// `j = floor(rng * (i + 1))`, swap.
pub fn shuffle<T>(items: &mut [T], rng: &mut SeededRng) {
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = (rng.next_f64() * (i as f64 + 1.0)) as usize;
        items.swap(i, j);
    }
}

/// 32-bit FNV-1a over UTF-16 code units.
///
/// Seeds are derived from participant/trial identifier strings, so the hash
/// must be order-sensitive and identical across platforms. Operating on code
/// units keeps it independent of locale and OS encoding behavior.
pub fn fnv1a(s: &str) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for unit in s.encode_utf16() {
        h ^= unit as u32;
        h = h.wrapping_mul(16_777_619);
    }
    h
}
