//! Recursive radix-2 decimation-in-time Fourier transform.

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use super::AnalysisError;

/// Forward DFT of `buf`, computed in place.
///
/// Sizes 0 and 1 are returned unchanged. Any other size must be a power of
/// two; anything else is rejected before `buf` is touched.
pub fn fft_in_place(buf: &mut [Complex<f64>]) -> Result<(), AnalysisError> {
    let n = buf.len();
    if n <= 1 {
        return Ok(());
    }
    if !n.is_power_of_two() {
        return Err(AnalysisError::NotPowerOfTwo(n));
    }
    radix2(buf);
    Ok(())
}

fn radix2(buf: &mut [Complex<f64>]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    let half = n / 2;

    let mut even: Vec<Complex<f64>> = buf.iter().step_by(2).copied().collect();
    let mut odd: Vec<Complex<f64>> = buf.iter().skip(1).step_by(2).copied().collect();
    radix2(&mut even);
    radix2(&mut odd);

    for k in 0..half {
        let t = twiddle(k, n) * odd[k];
        buf[k] = even[k] + t;
        buf[k + half] = even[k] - t;
    }
}

/// `exp(-2πi·k/n)`
pub fn twiddle(k: usize, n: usize) -> Complex<f64> {
    Complex::from_polar(1.0, -2.0 * PI * k as f64 / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    const EPS: f64 = 1e-9;

    fn real(samples: &[f64]) -> Vec<Complex<f64>> {
        samples.iter().map(|&s| Complex::new(s, 0.0)).collect()
    }

    /// Deterministic pseudo-random samples in [-1, 1).
    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn trivial_sizes_are_unchanged() {
        let mut empty: Vec<Complex<f64>> = Vec::new();
        fft_in_place(&mut empty).unwrap();
        assert!(empty.is_empty());

        let mut single = vec![Complex::new(0.75, -0.25)];
        fft_in_place(&mut single).unwrap();
        assert_eq!(single[0], Complex::new(0.75, -0.25));
    }

    #[test]
    fn rejects_non_power_of_two() {
        let original = real(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut buf = original.clone();
        assert_eq!(fft_in_place(&mut buf), Err(AnalysisError::NotPowerOfTwo(6)));
        assert_eq!(buf, original);
    }

    #[test]
    fn dc_input_lands_in_bin_zero() {
        let mut buf = real(&[1.0; 8]);
        fft_in_place(&mut buf).unwrap();
        assert!((buf[0].re - 8.0).abs() < EPS);
        for bin in &buf[1..] {
            assert!(bin.norm() < EPS);
        }
    }

    #[test]
    fn sinusoid_lands_in_its_bin_and_mirror() {
        let n = 8;
        let k = 2;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * k as f64 * i as f64 / n as f64).cos())
            .collect();
        let mut buf = real(&samples);
        fft_in_place(&mut buf).unwrap();

        for (bin, value) in buf.iter().enumerate() {
            if bin == k || bin == n - k {
                assert!((value.norm() - n as f64 / 2.0).abs() < EPS);
            } else {
                assert!(value.norm() < EPS, "bin {bin} = {value}");
            }
        }
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut samples = vec![0.0; 16];
        samples[0] = 1.0;
        let mut buf = real(&samples);
        fft_in_place(&mut buf).unwrap();
        for bin in &buf {
            assert!((bin.re - 1.0).abs() < EPS);
            assert!(bin.im.abs() < EPS);
        }
    }

    #[test]
    fn matches_rustfft_for_power_of_two_sizes() {
        let mut planner = FftPlanner::<f64>::new();
        for exp in 1..=10 {
            let n = 1usize << exp;
            let input = real(&noise(n, exp as u64));

            let mut ours = input.clone();
            fft_in_place(&mut ours).unwrap();

            let mut reference = input;
            planner.plan_fft_forward(n).process(&mut reference);

            for (a, b) in ours.iter().zip(reference.iter()) {
                assert!((a - b).norm() < 1e-7 * n as f64, "size {n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn twiddle_quarter_turns() {
        assert!((twiddle(0, 4) - Complex::new(1.0, 0.0)).norm() < EPS);
        assert!((twiddle(1, 4) - Complex::new(0.0, -1.0)).norm() < EPS);
        assert!((twiddle(2, 4) - Complex::new(-1.0, 0.0)).norm() < EPS);
    }
}
