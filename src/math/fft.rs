//! FFT length selection and a small real-to-complex magnitude-spectrum
//! wrapper around `realfft`, in the style `openmeters` uses for its
//! spectrogram and waveform-frequency analyzers.

use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Smallest 5-smooth integer (factors in {2, 3, 5}) that is `>= n`.
///
/// `rustfft`/`realfft` are fast for any length but fastest for 5-smooth
/// ones; this mirrors `scipy.fft.next_fast_len`'s contract without pulling
/// in a dependency purely for that one function.
pub fn next_fast_len(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let mut candidate = n;
    loop {
        if is_5_smooth(candidate) {
            return candidate;
        }
        candidate += 1;
    }
}

fn is_5_smooth(mut n: usize) -> bool {
    for p in [2usize, 3, 5] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Computes `|rfft(data, len)|`, zero-padding or truncating `data` to `len`.
#[derive(Clone)]
pub struct RealMagnitudeFft {
    fft: Arc<dyn RealToComplex<f32>>,
    len: usize,
}

impl std::fmt::Debug for RealMagnitudeFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealMagnitudeFft")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl RealMagnitudeFft {
    pub fn new(len: usize) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(len.max(1));
        Self { fft, len: len.max(1) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Output length: `len / 2 + 1`.
    pub fn output_len(&self) -> usize {
        self.len / 2 + 1
    }

    pub fn magnitude(&self, data: &[f32]) -> Vec<f32> {
        let mut input = self.fft.make_input_vec();
        let n = data.len().min(self.len);
        input[..n].copy_from_slice(&data[..n]);

        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        self.fft
            .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
            .expect("rfft forward with correctly sized buffers cannot fail");

        spectrum.iter().map(|c| c.norm()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_fast_len_returns_5_smooth() {
        for n in 1..2000 {
            let fast = next_fast_len(n);
            assert!(fast >= n);
            assert!(is_5_smooth(fast), "{fast} not 5-smooth");
        }
    }

    #[test]
    fn next_fast_len_is_identity_on_fast_lengths() {
        for &n in &[1, 2, 3, 4, 5, 6, 8, 9, 10, 12, 15, 16, 1024] {
            assert_eq!(next_fast_len(n), n);
        }
    }

    #[test]
    fn magnitude_of_dc_signal_peaks_at_bin_zero() {
        let fft = RealMagnitudeFft::new(64);
        let data = vec![1.0f32; 64];
        let mag = fft.magnitude(&data);
        assert_eq!(mag.len(), fft.output_len());
        assert!(mag[0] > mag[1]);
        assert!(mag[0] > 60.0);
    }
}
