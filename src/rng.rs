//! Seeded pseudo-random stream for test-case generation.
//!
//! The stream is explicit state: each test body takes a `&mut TestRng`
//! derived from the run seed, so iterations are reproducible from
//! `(seed, iteration)` alone and never touch wall-clock time.
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

#[derive(Clone, Debug)]
pub struct TestRng {
    inner: ChaCha8Rng,
}

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[a, b)`. Returns `a` for an empty range.
    pub fn next_int(&mut self, a: i32, b: i32) -> i32 {
        if b <= a {
            return a;
        }
        self.inner.random_range(a..b)
    }

    /// Uniform real in `[a, b)`.
    pub fn next_real(&mut self, a: f64, b: f64) -> f64 {
        if b <= a {
            return a;
        }
        self.inner.random_range(a..b)
    }

    /// `2^e` for `e` uniform in `[min_log2, max_log2)`.
    pub fn log_uniform(&mut self, min_log2: f64, max_log2: f64) -> f64 {
        self.next_real(min_log2, max_log2).exp2()
    }

    /// Fill `out` with bytes uniform in `range` (half-open).
    pub fn fill_range(&mut self, out: &mut [u8], range: Range<u16>) {
        if range.end <= range.start + 1 {
            out.fill(range.start.min(255) as u8);
            return;
        }
        if range.start == 0 && range.end == 256 {
            self.inner.fill_bytes(out);
            return;
        }
        for px in out.iter_mut() {
            *px = self.inner.random_range(range.clone()) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = TestRng::new(0xC0FFEE);
        let mut b = TestRng::new(0xC0FFEE);
        let xs: Vec<i32> = (0..32).map(|_| a.next_int(0, 256)).collect();
        let ys: Vec<i32> = (0..32).map(|_| b.next_int(0, 256)).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, {
            let mut c = TestRng::new(1);
            (0..32).map(|_| c.next_int(0, 256)).collect::<Vec<_>>()
        });
    }

    #[test]
    fn ranges_are_half_open() {
        let mut rng = TestRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_int(3, 5);
            assert!((3..5).contains(&v));
            let s = rng.log_uniform(0.0, 10.0);
            assert!((1.0..1024.0).contains(&s));
        }
        let mut buf = vec![0u8; 512];
        rng.fill_range(&mut buf, 0..2);
        assert!(buf.iter().all(|&v| v < 2));
        assert!(buf.iter().any(|&v| v == 1));
        rng.fill_range(&mut buf, 9..10);
        assert!(buf.iter().all(|&v| v == 9));
    }
}
