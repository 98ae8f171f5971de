//! Analysis window functions

/// Half-sine window scaled so that energy is preserved: for constant-energy
/// input `x`, `sum((x[i] * w[i])^2) == sum(x[i]^2)`, i.e. `sum(w[i]^2) ==
/// length`.
pub fn sine_window(length: usize) -> Vec<f32> {
    let scale = std::f32::consts::SQRT_2;
    (0..length)
        .map(|i| scale * (std::f32::consts::PI * i as f32 / length as f32).sin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_energy() {
        let w = sine_window(2048);
        let sum_sq: f32 = w.iter().map(|x| x * x).sum();
        assert!((sum_sq - 2048.0).abs() < 1.0);
    }

    #[test]
    fn starts_and_ends_near_zero() {
        let w = sine_window(1024);
        assert!(w[0].abs() < 1e-4);
        assert!(w[1023] < 0.01);
    }
}
