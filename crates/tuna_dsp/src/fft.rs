//! Real-to-complex spectral engine
//!
//! Wraps a reusable `realfft` plan behind the same open/transform contract
//! the analysis stages share: a caller takes exclusive access to the
//! time-domain buffer, fills it, then transforms in place. After the
//! transform the first `length / 2` floats hold `|X[k]|^2 / length`,
//! overwriting the time-domain samples — callers must read the spectrum
//! before reusing the buffer.

use crate::error::DspError;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Real-to-complex FFT with a resizable, reusable plan.
///
/// `set_length` only reallocates when the requested length grows past the
/// current capacity, so repeated calls with a stable or shrinking length are
/// cheap. The `open`/`transform` pair guards against re-entrant use: calling
/// `open` twice without an intervening `transform` is a logic error.
pub struct Spectrum {
    planner: RealFftPlanner<f32>,
    plan: Arc<dyn RealToComplex<f32>>,
    length: usize,
    time_domain: Vec<f32>,
    freq_domain: Vec<Complex32>,
    open: bool,
}

impl Spectrum {
    /// Build an engine with no plan yet; the first `set_length` call plans it.
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::new();
        let plan = planner.plan_fft_forward(2);
        Spectrum {
            planner,
            plan,
            length: 2,
            time_domain: vec![0.0; 2],
            freq_domain: vec![Complex32::new(0.0, 0.0); 2],
            open: false,
        }
    }

    /// Current transform length.
    pub fn length(&self) -> usize {
        self.length
    }

    /// (Re)plan the transform for `length` real samples. Idempotent when
    /// `length` matches the current length.
    pub fn set_length(&mut self, length: usize) -> Result<(), DspError> {
        if length == 0 {
            return Err(DspError::InvalidFftLength(length));
        }
        if length == self.length {
            return Ok(());
        }
        self.plan = self.planner.plan_fft_forward(length);
        self.length = length;
        self.time_domain = vec![0.0; length];
        self.freq_domain = self.plan.make_output_vec();
        self.open = false;
        Ok(())
    }

    /// Take exclusive access to the time-domain buffer for writing.
    pub fn open(&mut self) -> Result<&mut [f32], DspError> {
        if self.open {
            return Err(DspError::AlreadyOpen);
        }
        self.open = true;
        Ok(&mut self.time_domain)
    }

    /// Zero the time-domain buffer from `from` to its end, without closing
    /// the open guard. Used to zero-pad a short pulse up to `fft_length`.
    pub fn zero_pad_from(&mut self, from: usize) {
        if let Some(tail) = self.time_domain.get_mut(from..) {
            tail.fill(0.0);
        }
    }

    /// Execute the plan and compute `|X[k]|^2 / length` into the first
    /// `length / 2` entries of the time-domain buffer, which the caller
    /// should then read as the power spectrum.
    pub fn transform(&mut self) -> Result<&[f32], DspError> {
        if !self.open {
            return Err(DspError::NotOpen);
        }
        self.plan
            .process(&mut self.time_domain, &mut self.freq_domain)
            .expect("realfft buffer sizes are kept in sync by set_length");

        let n = self.length as f32;
        let half = self.length / 2;
        for (bin, c) in self.freq_domain.iter().take(half).enumerate() {
            self.time_domain[bin] = (c.re * c.re + c.im * c.im) / n;
        }
        self.open = false;
        Ok(&self.time_domain[..half])
    }
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_concentrates_in_bin_zero() {
        let mut s = Spectrum::new();
        s.set_length(8192).unwrap();
        let buf = s.open().unwrap();
        buf.fill(1.0);
        let spectrum = s.transform().unwrap();
        assert!((spectrum[0] - 8192.0).abs() < 1e-2);
        for &v in &spectrum[1..] {
            assert!(v.abs() < 1e-3);
        }
    }

    #[test]
    fn pure_tone_lands_in_expected_bin() {
        let mut s = Spectrum::new();
        let n = 8192;
        s.set_length(n).unwrap();
        let buf = s.open().unwrap();
        for (i, x) in buf.iter_mut().enumerate() {
            *x = (2.0 * std::f32::consts::PI * 1024.0 * i as f32 / n as f32).sin();
        }
        let spectrum = s.transform().unwrap();
        assert!((spectrum[1024] - 2048.0).abs() < 5.0);
        // A sine sitting exactly on a bin leaks no energy into the others;
        // what's left is f32 round-off, not signal.
        for (i, &v) in spectrum.iter().enumerate() {
            if i != 1024 {
                assert!(v.abs() < 1e-3, "bin {i} leaked {v}");
            }
        }
    }

    #[test]
    fn zero_input_is_all_zero() {
        let mut s = Spectrum::new();
        s.set_length(4096).unwrap();
        s.open().unwrap();
        let spectrum = s.transform().unwrap();
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn reentrant_open_without_transform_errors() {
        let mut s = Spectrum::new();
        s.set_length(64).unwrap();
        s.open().unwrap();
        assert!(matches!(s.open(), Err(DspError::AlreadyOpen)));
    }

    #[test]
    fn set_length_resets_open_guard() {
        let mut s = Spectrum::new();
        s.set_length(64).unwrap();
        s.open().unwrap();
        s.set_length(128).unwrap();
        assert!(s.open().is_ok());
    }
}
