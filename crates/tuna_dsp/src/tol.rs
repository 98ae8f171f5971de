//! Third-octave level (TOL) filter bank
//!
//! Aggregates FFT bin power into the standard ISO third-octave bands, with a
//! half-sine cross-fade at each band boundary so that energy straddling a
//! boundary is split smoothly rather than hard-clipped to one band.

pub const MAX_THIRD_OCTAVE_LEVELS: usize = 43;

const BAND_CENTRES: [f32; MAX_THIRD_OCTAVE_LEVELS] = [
    10.0, 12.5, 16.0, 20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0,
    315.0, 400.0, 500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0,
    5000.0, 6300.0, 8000.0, 10000.0, 12500.0, 16000.0, 20000.0, 25000.0, 31500.0, 40000.0,
    50000.0, 63000.0, 80000.0, 100000.0, 125000.0, 160000.0,
];

const BAND_EDGES: [f32; MAX_THIRD_OCTAVE_LEVELS + 1] = [
    11.22, 14.13, 17.78, 22.39, 28.18, 35.48, 44.67, 56.23, 70.79, 89.13, 112.2, 141.3, 177.8,
    223.9, 281.8, 354.8, 446.7, 562.3, 707.9, 891.3, 1122.0, 1413.0, 1778.0, 2239.0, 2818.0,
    3548.0, 4467.0, 5623.0, 7079.0, 8913.0, 11220.0, 14130.0, 17780.0, 22390.0, 28180.0, 35480.0,
    44670.0, 56230.0, 70790.0, 89130.0, 112200.0, 141300.0, 177800.0, 223900.0,
];

struct Transition {
    t_onset: usize,
    t_width: usize,
    coeffs: Vec<f32>,
}

/// Repeated half-sine fold used to shape the cross-fade coefficients.
fn phi(mut p: f32, l: u32) -> f32 {
    for _ in 0..l {
        p = (p * std::f32::consts::FRAC_PI_2).sin();
    }
    p
}

/// A bank of third-octave bands built for a given sample rate and analysis
/// length. `overlap` controls how wide the cross-fade region is relative to
/// the gap between adjacent band edges and must stay below 0.5.
pub struct TolBank {
    n_tol: usize,
    desc: Vec<Transition>,
}

impl TolBank {
    pub fn new(sample_rate: u32, analysis_length: usize, overlap: f32, phi_l: u32) -> Self {
        assert!(overlap < 0.5, "overlap must stay below 0.5");
        let step = sample_rate as f32 / analysis_length as f32;
        let nyquist = sample_rate as f32 / 2.0;

        let mut desc = Vec::with_capacity(MAX_THIRD_OCTAVE_LEVELS);

        for i in 0..MAX_THIRD_OCTAVE_LEVELS {
            let delta = 2.0 * overlap * ((BAND_EDGES[i] * BAND_EDGES[i + 1]).sqrt() - BAND_EDGES[i]);
            let t_onset = ((BAND_EDGES[i] - delta) / step).ceil() as usize;
            let t_end = ((BAND_EDGES[i] + delta) / step).floor() as usize;
            let t_width = 1 + t_end - t_onset;

            if t_end as f32 > nyquist {
                break;
            }

            let mut coeffs = vec![0.0f32; 2 * t_width];
            for j in 0..t_width {
                let p = if delta != 0.0 {
                    let cur_freq = t_onset as f32 + j as f32 * step;
                    (cur_freq - BAND_EDGES[i]) / delta
                } else {
                    0.0
                };
                let tmp = (1.0 + phi(p, phi_l)) * std::f32::consts::FRAC_PI_4;
                coeffs[2 * j] = tmp.cos() * tmp.cos();
                coeffs[2 * j + 1] = tmp.sin() * tmp.sin();
            }

            desc.push(Transition {
                t_onset,
                t_width,
                coeffs,
            });
        }

        let n_tol = desc.len();
        TolBank { n_tol, desc }
    }

    pub fn num_levels(&self) -> usize {
        self.n_tol
    }

    pub fn band_centre(band: usize) -> Option<f32> {
        BAND_CENTRES.get(band).copied()
    }

    pub fn band_edge(band: usize) -> Option<f32> {
        BAND_EDGES.get(band).copied()
    }

    /// Accumulate `data`'s power spectrum into `results`, which the caller
    /// must have zeroed first. `results` must have at least `num_levels()`
    /// entries.
    pub fn calculate(&self, data: &[f32], results: &mut [f32]) {
        let mut j = 0usize;
        for (i, tr) in self.desc.iter().enumerate() {
            let unweighted: f32 = data[j..tr.t_onset].iter().sum();
            results[i] += unweighted;

            let mut sum0 = 0.0f32;
            let mut sum1 = 0.0f32;
            for k in 0..tr.t_width {
                let x = data[tr.t_onset + k];
                sum0 += x * tr.coeffs[2 * k];
                sum1 += x * tr.coeffs[2 * k + 1];
            }
            results[i] += sum0;
            if i + 1 < results.len() {
                results[i + 1] += sum1;
            }

            j = tr.t_onset + tr.t_width;
        }
    }

    /// Reconstruct the full per-bin coefficient curve for band `level`,
    /// including the flat (unity) and zero regions either side of its two
    /// transitions. Used for diagnostics, not the hot analysis path.
    pub fn coeffs_for(&self, level: usize, dest: &mut [f32]) -> Option<()> {
        if level >= self.n_tol {
            return None;
        }
        let upper = &self.desc[level];
        let mut offset = 0usize;

        if level > 0 {
            let lower = &self.desc[level - 1];
            dest[..lower.t_onset].fill(0.0);
            offset = lower.t_onset;
            for i in 0..lower.t_width {
                dest[offset + i] = lower.coeffs[1 + 2 * i];
            }
            offset += lower.t_width;
        }

        dest[offset..upper.t_onset].fill(1.0);
        offset = upper.t_onset;
        for i in 0..upper.t_width {
            dest[offset + i] = upper.coeffs[2 * i];
        }
        offset += upper.t_width;

        dest[offset..].fill(0.0);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_spectrum_energy_is_conserved_across_bands() {
        let bank = TolBank::new(8192, 8192, 0.4, 3);
        let half = 8192 / 2;
        let data = vec![1.0f32; half];
        let mut results = vec![0.0f32; bank.num_levels()];
        bank.calculate(&data, &mut results);

        let total: f32 = results.iter().sum();
        let last = &bank.desc[bank.num_levels() - 1];
        let covered = (last.t_onset + last.t_width) as f32;
        assert!((total - covered).abs() < 1.0, "total={total} covered={covered}");
    }

    #[test]
    fn cross_fade_weights_sum_to_one() {
        let bank = TolBank::new(48000, 8192, 0.4, 3);
        for tr in &bank.desc {
            for k in 0..tr.t_width {
                let s = tr.coeffs[2 * k] + tr.coeffs[2 * k + 1];
                assert!((s - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn num_levels_shrinks_for_low_sample_rates() {
        let bank = TolBank::new(2000, 2048, 0.4, 3);
        assert!(bank.num_levels() < MAX_THIRD_OCTAVE_LEVELS);
    }

    #[test]
    fn band_centre_and_edge_lookup() {
        assert_eq!(TolBank::band_centre(0), Some(10.0));
        assert_eq!(TolBank::band_edge(MAX_THIRD_OCTAVE_LEVELS), Some(223900.0));
        assert_eq!(TolBank::band_centre(MAX_THIRD_OCTAVE_LEVELS), None);
    }

    #[test]
    fn zero_spectrum_yields_zero_bands() {
        let bank = TolBank::new(8192, 8192, 0.4, 3);
        let data = vec![0.0f32; 8192 / 2];
        let mut results = vec![0.0f32; bank.num_levels()];
        bank.calculate(&data, &mut results);
        assert!(results.iter().all(|&v| v == 0.0));
    }
}
