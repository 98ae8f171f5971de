//! Sliding minimum filter
//!
//! Ascending-minima deque, after Richard Harter's 2001 algorithm: each
//! insertion is amortised O(1) regardless of window length. The deque
//! stores `(value, expiry_tick)` pairs in a fixed-capacity ring; the value
//! at the left end is always the minimum of the current window.
//!
//! Generic over the sample type so the envelope tracker in the pulse stage
//! can track `Sample` (integer) minima directly, matching the original's
//! exact-integer threshold comparisons, without going through a lossy
//! float round-trip.

use crate::error::DspError;

struct Entry<T> {
    value: T,
    expiry: u64,
}

pub struct SlidingMinimum<T> {
    window: usize,
    ring: Vec<Entry<T>>,
    left: usize,
    right: usize,
    len: usize,
    ticker: u64,
}

impl<T: Copy + PartialOrd + Default> SlidingMinimum<T> {
    pub fn new(window: usize) -> Result<Self, DspError> {
        if window == 0 {
            return Err(DspError::WindowTooLarge {
                window,
                capacity: 0,
            });
        }
        Ok(SlidingMinimum {
            window,
            ring: (0..window)
                .map(|_| Entry {
                    value: T::default(),
                    expiry: 0,
                })
                .collect(),
            left: 0,
            right: 0,
            len: 0,
            ticker: 0,
        })
    }

    /// Advance by one tick with a new sample, return the minimum of the
    /// trailing `window` samples (including this one).
    pub fn next(&mut self, x: T) -> T {
        self.ticker += 1;

        if self.len > 0 && self.ring[self.left].expiry == self.ticker {
            self.left = (self.left + 1) % self.window;
            self.len -= 1;
        }

        while self.len > 0 {
            let last = (self.left + self.len - 1) % self.window;
            if self.ring[last].value > x {
                self.len -= 1;
            } else {
                break;
            }
        }

        self.right = (self.left + self.len) % self.window;
        self.ring[self.right] = Entry {
            value: x,
            expiry: self.ticker + self.window as u64,
        };
        self.len += 1;

        self.current()
    }

    pub fn current(&self) -> T {
        self.ring[self.left].value
    }

    /// Age of the current minimum in samples. Signed: the original C
    /// implementation computes this as a plain signed subtraction and
    /// callers rely on it staying signed (see module docs on preserved
    /// edge-case behaviour). Do not clamp this to an unsigned type.
    pub fn current_age(&self) -> i64 {
        self.window as i64 - (self.ring[self.left].expiry as i64 - self.ticker as i64)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reset(&mut self) {
        self.left = 0;
        self.right = 0;
        self.len = 0;
        self.ticker = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_min(data: &[f32], window: usize) -> Vec<f32> {
        let mut out = Vec::new();
        for k in window..=data.len() {
            out.push(data[k - window..k].iter().cloned().fold(f32::MAX, f32::min));
        }
        out
    }

    #[test]
    fn matches_brute_force_minimum() {
        let data: Vec<f32> = (0..50)
            .map(|i| ((i as f32) * 0.37).sin() * 10.0)
            .collect();
        let window = 7;
        let mut sm = SlidingMinimum::<f32>::new(window).unwrap();
        let mut observed = Vec::new();
        for &x in &data {
            let m = sm.next(x);
            observed.push(m);
        }
        let expected = brute_force_min(&data, window);
        assert_eq!(observed[window - 1..], expected[..]);
    }

    #[test]
    fn monotonic_increasing_input_minimum_is_oldest_in_window() {
        let window = 4;
        let mut sm = SlidingMinimum::<f32>::new(window).unwrap();
        let mut last = 0.0;
        for i in 0..20 {
            last = sm.next(i as f32);
        }
        assert_eq!(last, 16.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut sm = SlidingMinimum::<f32>::new(3).unwrap();
        sm.next(5.0);
        sm.next(1.0);
        sm.reset();
        assert!(sm.is_empty());
        assert_eq!(sm.next(9.0), 9.0);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(SlidingMinimum::<f32>::new(0).is_err());
    }

    #[test]
    fn works_over_integer_samples() {
        let mut sm = SlidingMinimum::<i32>::new(3).unwrap();
        sm.next(10);
        sm.next(5);
        assert_eq!(sm.next(7), 5);
    }
}
