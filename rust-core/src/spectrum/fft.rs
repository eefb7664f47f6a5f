//! Radix-2 FFT engine with real-signal transforms
//!
//! Real input is packed two samples per complex slot, so an N-point real
//! transform costs one N/2-point complex transform plus a split pass.

use crate::error::{Result, SpectralError};
use num_complex::Complex;
use std::f64::consts::PI;

/// Transform direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Time to frequency, kernel e^(-i2πkn/N)
    Forward,
    /// Frequency to time, kernel e^(+i2πkn/N)
    Inverse,
}

/// Which direction carries the 1/N scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Forward transform divides by N. Real-input bins then read directly
    /// as sinusoid amplitudes.
    #[default]
    Forward,
    /// Inverse transform divides by N (the textbook convention)
    Inverse,
}

/// Round a requested transform size up to the next power of two (minimum 2)
pub fn transform_size(requested: usize) -> usize {
    requested.next_power_of_two().max(2)
}

/// In-place complex FFT
///
/// Bit-reversal permutation followed by iterative radix-2 butterflies.
/// `data.len()` must be a power of two.
pub fn fft_in_place(data: &mut [Complex<f64>], direction: Direction, normalization: Normalization) {
    let n = data.len();
    debug_assert!(n.is_power_of_two(), "FFT length must be a power of two");
    if n < 2 {
        return;
    }

    bit_reverse(data);

    let sign = match direction {
        Direction::Forward => -1.0,
        Direction::Inverse => 1.0,
    };

    let mut half = 1;
    while half < n {
        let wp = Complex::from_polar(1.0, sign * PI / half as f64);
        let mut w = Complex::new(1.0, 0.0);
        for m in 0..half {
            let mut k = m;
            while k < n {
                let i = k + half;
                let even = data[k];
                let odd = w * data[i];
                data[k] = even + odd;
                data[i] = even - odd;
                k += 2 * half;
            }
            w *= wp;
        }
        half *= 2;
    }

    let scaled = matches!(
        (direction, normalization),
        (Direction::Forward, Normalization::Forward) | (Direction::Inverse, Normalization::Inverse)
    );
    if scaled {
        let scale = 1.0 / n as f64;
        for s in data.iter_mut() {
            *s *= scale;
        }
    }
}

fn bit_reverse(data: &mut [Complex<f64>]) {
    let n = data.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }
}

/// FFT engine for real-valued signals
///
/// Owns its scratch buffers; every result is a view into them and is only
/// valid until the next transform call.
pub struct FftEngine {
    /// Real transform size N
    size: usize,

    normalization: Normalization,

    /// Half-size complex scratch (N/2 + 1 slots)
    spectrum: Vec<Complex<f64>>,

    /// Real output scratch (N samples)
    real: Vec<f64>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `size` - Real transform size, rounded up to a power of two
    /// * `normalization` - Direction that applies the 1/N scaling
    pub fn new(size: usize, normalization: Normalization) -> Result<Self> {
        if size == 0 {
            return Err(SpectralError::ZeroTransformSize);
        }
        let n = transform_size(size);
        if n != size {
            log::warn!("FFT size {} is not a power of two, using {}", size, n);
        }

        Ok(Self {
            size: n,
            normalization,
            spectrum: vec![Complex::new(0.0, 0.0); n / 2 + 1],
            real: vec![0.0; n],
        })
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get number of frequency bins (size/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Centre frequency in Hz of `bin`
    pub fn bin_frequency(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.size as f64
    }

    /// Real-to-complex forward transform
    ///
    /// Input shorter than the transform size is zero-padded, longer input is
    /// truncated.
    ///
    /// # Returns
    /// N/2 + 1 bins; bin 0 (DC) and bin N/2 (Nyquist) are purely real
    pub fn forward_real(&mut self, input: &[f64]) -> &[Complex<f64>] {
        let half = self.size / 2;
        self.forward_packed_core(input);
        let dc_nyq = self.spectrum[0];
        self.spectrum[0] = Complex::new(dc_nyq.re, 0.0);
        self.spectrum[half] = Complex::new(dc_nyq.im, 0.0);
        &self.spectrum
    }

    /// Real-to-complex forward transform in packed layout
    ///
    /// # Returns
    /// N/2 slots; slot 0 holds (DC, Nyquist) as (re, im)
    pub fn forward_real_packed(&mut self, input: &[f64]) -> &[Complex<f64>] {
        let half = self.size / 2;
        self.forward_packed_core(input);
        &self.spectrum[..half]
    }

    /// Complex-to-real inverse transform, exact inverse of [`forward_real`]
    ///
    /// Expects N/2 + 1 bins; missing bins are treated as zero. The imaginary
    /// parts of the DC and Nyquist bins are ignored.
    ///
    /// [`forward_real`]: FftEngine::forward_real
    pub fn inverse_real(&mut self, spectrum: &[Complex<f64>]) -> &[f64] {
        let half = self.size / 2;
        let copy_len = spectrum.len().min(half + 1);
        self.spectrum[..copy_len].copy_from_slice(&spectrum[..copy_len]);
        self.spectrum[copy_len..].fill(Complex::new(0.0, 0.0));
        let nyq = self.spectrum[half].re;
        self.spectrum[0].im = nyq;
        self.inverse_packed_core()
    }

    /// Complex-to-real inverse transform from packed layout
    pub fn inverse_real_packed(&mut self, spectrum: &[Complex<f64>]) -> &[f64] {
        let half = self.size / 2;
        let copy_len = spectrum.len().min(half);
        self.spectrum[..copy_len].copy_from_slice(&spectrum[..copy_len]);
        self.spectrum[copy_len..].fill(Complex::new(0.0, 0.0));
        self.inverse_packed_core()
    }

    fn forward_packed_core(&mut self, input: &[f64]) {
        let half = self.size / 2;
        for (i, slot) in self.spectrum[..half].iter_mut().enumerate() {
            let re = input.get(2 * i).copied().unwrap_or(0.0);
            let im = input.get(2 * i + 1).copied().unwrap_or(0.0);
            *slot = Complex::new(re, im);
        }

        fft_in_place(&mut self.spectrum[..half], Direction::Forward, self.normalization);

        let z0 = self.spectrum[0];
        self.spectrum[0] = Complex::new((z0.re + z0.im) * 0.5, (z0.re - z0.im) * 0.5);

        let wp = Complex::from_polar(1.0, -PI / half as f64);
        let mut w = wp;
        let j_half = Complex::new(0.0, 0.5);
        for i in 1..half / 2 {
            let j = half - i;
            let (a, b) = (self.spectrum[i], self.spectrum[j]);
            let even = (a + b.conj()) * 0.5;
            let odd = j_half * (b.conj() - a);
            self.spectrum[i] = even + w * odd;
            self.spectrum[j] = (even - w * odd).conj();
            w *= wp;
        }
        // The quarter-rate bin pairs with itself: X[N/4] = conj(Z[N/4])
        if half >= 2 {
            self.spectrum[half / 2] = self.spectrum[half / 2].conj();
        }
    }

    fn inverse_packed_core(&mut self) -> &[f64] {
        let half = self.size / 2;

        let z0 = self.spectrum[0];
        self.spectrum[0] = Complex::new(z0.re + z0.im, z0.re - z0.im);
        if half >= 2 {
            self.spectrum[half / 2] = self.spectrum[half / 2].conj();
        }

        let wp = Complex::from_polar(1.0, PI / half as f64);
        let mut w = wp;
        let j_half = Complex::new(0.0, 0.5);
        for i in 1..half / 2 {
            let j = half - i;
            let (a, b) = (self.spectrum[i], self.spectrum[j]);
            let even = (a + b.conj()) * 0.5;
            let odd = j_half * (a - b.conj());
            self.spectrum[i] = even + w * odd;
            self.spectrum[j] = (even - w * odd).conj();
            w *= wp;
        }

        fft_in_place(&mut self.spectrum[..half], Direction::Inverse, self.normalization);

        for (i, z) in self.spectrum[..half].iter().enumerate() {
            self.real[2 * i] = z.re;
            self.real[2 * i + 1] = z.im;
        }
        &self.real
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realfft::RealFftPlanner;
    use rustfft::FftPlanner;

    fn test_signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                let t = n as f64;
                (0.3 * t).sin() + 0.5 * (1.7 * t + 0.2).cos() + 0.1 * (n % 7) as f64
            })
            .collect()
    }

    #[test]
    fn test_size_rounding() {
        assert_eq!(transform_size(1), 2);
        assert_eq!(transform_size(1000), 1024);
        assert_eq!(transform_size(1024), 1024);

        let fft = FftEngine::new(1000, Normalization::Forward).unwrap();
        assert_eq!(fft.size(), 1024);
        assert_eq!(fft.num_bins(), 513);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            FftEngine::new(0, Normalization::Forward),
            Err(SpectralError::ZeroTransformSize)
        ));
    }

    #[test]
    fn test_complex_matches_rustfft() {
        let n = 64;
        let input: Vec<Complex<f64>> = test_signal(2 * n)
            .chunks(2)
            .map(|c| Complex::new(c[0], c[1]))
            .collect();

        let mut reference = input.clone();
        FftPlanner::<f64>::new().plan_fft_forward(n).process(&mut reference);

        let mut ours = input.clone();
        fft_in_place(&mut ours, Direction::Forward, Normalization::Forward);

        for (a, b) in ours.iter().zip(reference.iter()) {
            assert!((*a - *b / n as f64).norm() < 1e-10);
        }

        // Inverse-normalized forward is the raw DFT
        let mut raw = input;
        fft_in_place(&mut raw, Direction::Forward, Normalization::Inverse);
        for (a, b) in raw.iter().zip(reference.iter()) {
            assert!((*a - *b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_complex_round_trip() {
        let input: Vec<Complex<f64>> = test_signal(32)
            .iter()
            .map(|&x| Complex::new(x, -0.5 * x))
            .collect();
        let mut data = input.clone();
        fft_in_place(&mut data, Direction::Forward, Normalization::Forward);
        fft_in_place(&mut data, Direction::Inverse, Normalization::Forward);
        for (a, b) in data.iter().zip(input.iter()) {
            assert!((*a - *b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_real_forward_matches_realfft() {
        let n = 256;
        let signal = test_signal(n);

        let r2c = RealFftPlanner::<f64>::new().plan_fft_forward(n);
        let mut input = signal.clone();
        let mut reference = r2c.make_output_vec();
        r2c.process(&mut input, &mut reference).unwrap();

        let mut fft = FftEngine::new(n, Normalization::Forward).unwrap();
        let ours = fft.forward_real(&signal);
        assert_eq!(ours.len(), n / 2 + 1);

        // DC and Nyquist are scaled by 1/N, interior bins by 2/N
        assert!((ours[0].re - reference[0].re / n as f64).abs() < 1e-12);
        assert!((ours[n / 2].re - reference[n / 2].re / n as f64).abs() < 1e-12);
        assert_eq!(ours[0].im, 0.0);
        for k in 1..n / 2 {
            let expected = reference[k] * (2.0 / n as f64);
            assert!((ours[k] - expected).norm() < 1e-12, "bin {} differs", k);
        }
    }

    #[test]
    fn test_sine_amplitude() {
        let n = 1024;
        let bin = 37;
        let signal: Vec<f64> = (0..n)
            .map(|i| 0.8 * (2.0 * PI * bin as f64 * i as f64 / n as f64).cos())
            .collect();

        let mut fft = FftEngine::new(n, Normalization::Forward).unwrap();
        let spectrum = fft.forward_real(&signal);

        assert!((spectrum[bin].norm() - 0.8).abs() < 1e-10);
        assert!(spectrum[bin + 3].norm() < 1e-10);
    }

    #[test]
    fn test_real_round_trip() {
        for &normalization in &[Normalization::Forward, Normalization::Inverse] {
            for &n in &[2usize, 4, 8, 64, 512] {
                let signal = test_signal(n);
                let mut fft = FftEngine::new(n, normalization).unwrap();
                let spectrum = fft.forward_real(&signal).to_vec();
                let restored = fft.inverse_real(&spectrum);
                for (a, b) in restored.iter().zip(signal.iter()) {
                    assert!((a - b).abs() < 1e-10, "n = {}", n);
                }
            }
        }
    }

    #[test]
    fn test_packed_layout() {
        let n = 128;
        let signal = test_signal(n);
        let mut fft = FftEngine::new(n, Normalization::Forward).unwrap();

        let unpacked = fft.forward_real(&signal).to_vec();
        let packed = fft.forward_real_packed(&signal).to_vec();

        assert_eq!(packed.len(), n / 2);
        assert!((packed[0].re - unpacked[0].re).abs() < 1e-12);
        assert!((packed[0].im - unpacked[n / 2].re).abs() < 1e-12);
        for k in 1..n / 2 {
            assert!((packed[k] - unpacked[k]).norm() < 1e-12);
        }

        let restored = fft.inverse_real_packed(&packed);
        for (a, b) in restored.iter().zip(signal.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_short_input_zero_padded() {
        let mut fft = FftEngine::new(64, Normalization::Forward).unwrap();
        let spectrum = fft.forward_real(&[1.0; 8]);
        // DC of eight ones over 64 points
        assert!((spectrum[0].re - 8.0 / 64.0).abs() < 1e-12);
    }
}
