use std::time::{SystemTime, UNIX_EPOCH};

/// Length of one seed epoch in milliseconds (8 hours).
pub const SEED_EPOCH_MS: i64 = 28_800_000;

const LCG_MULTIPLIER: i128 = 69069;
const LCG_MODULUS: i128 = 65536;

/// Seed derived from the wall clock, stable for the length of one epoch.
pub fn session_seed() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0);
    millis / SEED_EPOCH_MS
}

/// Seeded linear-congruential stream behind every random decision of the
/// packer. Two generators with the same seed and the same call order produce
/// identical output.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    seed: i64,
    state: i64,
}

impl SequenceGenerator {
    pub fn new(seed: i64) -> Self {
        Self { seed, state: seed }
    }

    pub fn from_session() -> Self {
        Self::new(session_seed())
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Rewind the cursor to the seed.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        // i128 keeps the product exact for any seed; `%` keeps the dividend's
        // sign and negative values are reflected.
        let next = (i128::from(self.state) * LCG_MULTIPLIER + 1) % LCG_MODULUS;
        self.state = next.unsigned_abs() as i64;
        self.state as f64 / LCG_MODULUS as f64
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let idx = (self.next_f64() * len as f64).floor() as usize;
        idx.min(len - 1)
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }

    /// Uniformly chosen element, without removal.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index(items.len());
        items.get(idx)
    }

    /// Remove and return a uniformly chosen element.
    pub fn pop<T>(&mut self, items: &mut Vec<T>) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index(items.len());
        Some(items.remove(idx))
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::from_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_values_follow_the_lcg() {
        let mut rng = SequenceGenerator::new(1);
        // (1 * 69069 + 1) % 65536 = 3534
        assert_eq!(rng.next_f64(), 3534.0 / 65536.0);
        // (3534 * 69069 + 1) % 65536 = 244089847 % 65536
        let expected = ((3534_i64 * 69069 + 1) % 65536) as f64 / 65536.0;
        assert_eq!(rng.next_f64(), expected);
    }

    #[test]
    fn negative_seeds_are_reflected() {
        let mut rng = SequenceGenerator::new(-5);
        let value = rng.next_f64();
        assert!((0.0..1.0).contains(&value));
        // (-5 * 69069 + 1) % 65536 = -(345344 % 65536) = -17664
        assert_eq!(value, 17664.0 / 65536.0);
    }

    #[test]
    fn reset_replays_the_stream() {
        let mut rng = SequenceGenerator::new(61_234);
        let first: Vec<f64> = (0..8).map(|_| rng.next_f64()).collect();
        rng.reset();
        let second: Vec<f64> = (0..8).map(|_| rng.next_f64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_is_a_permutation_and_deterministic() {
        let mut a = SequenceGenerator::new(42);
        let mut b = SequenceGenerator::new(42);
        let mut left: Vec<u32> = (0..20).collect();
        let mut right = left.clone();
        a.shuffle(&mut left);
        b.shuffle(&mut right);
        assert_eq!(left, right);
        let mut sorted = left.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn pick_and_pop_handle_empty_input() {
        let mut rng = SequenceGenerator::new(7);
        let empty: Vec<u8> = Vec::new();
        assert!(rng.pick(&empty).is_none());
        let mut empty = empty;
        assert!(rng.pop(&mut empty).is_none());
    }

    #[test]
    fn pop_removes_the_returned_element() {
        let mut rng = SequenceGenerator::new(9);
        let mut items = vec!['a', 'b', 'c', 'd'];
        let popped = rng.pop(&mut items).unwrap();
        assert_eq!(items.len(), 3);
        assert!(!items.contains(&popped));
    }
}
