//! TUNA DSP - spectral engine shared by the time-slice and pulse stages
//!
//! This crate provides:
//! - A reusable real-to-complex FFT wrapper (`Spectrum`)
//! - A third-octave-level filter bank (`TolBank`)
//! - An O(1)-amortised sliding minimum filter (`SlidingMinimum`)
//! - Analysis window generation (`sine_window`)
//!
//! None of these types touch I/O or threading; they are the pure-math core
//! that `tuna_core`'s pipeline stages drive.

mod error;
mod fft;
mod minima;
mod tol;
mod window;

pub use error::DspError;
pub use fft::Spectrum;
pub use minima::SlidingMinimum;
pub use tol::{TolBank, MAX_THIRD_OCTAVE_LEVELS};
pub use window::sine_window;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _spectrum = Spectrum::new();
        let _minima = SlidingMinimum::<f32>::new(8).unwrap();
        let _tol = TolBank::new(8192, 8192, 0.4, 3);
        let _window = sine_window(16);
    }
}
