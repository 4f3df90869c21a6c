//! Log-frequency-binned magnitude spectrum, used by the pitch-invariance
//! subsystem to compare a frame's spectral content against history and
//! decide whether (and by how much) to resample the reference buffer.

use crate::math::{RealMagnitudeFft, geomspace, next_fast_len};
use serde::{Deserialize, Serialize};

/// Tunables for the pitch-invariance subsystem. Defaults match the values
/// this crate's correlation trigger was originally tuned against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Lowest fencepost frequency, in Hz.
    pub min_hz: f64,
    pub octaves: u32,
    pub notes_per_octave: u32,
    /// Spectrum magnitude is raised to this power before binning.
    pub exponent: f32,
    /// If true, each bin is the mean of its FFT bins; if false, the sum.
    pub divide_by_freq: bool,
    /// Spectrum recompute is gated by this many elapsed frames, to avoid
    /// paying for an FFT every single frame.
    pub min_frames_between_recompute: u32,
    /// Depth of the raw-data history ring used to compute `prev_spectrum`.
    pub frames_to_lookbehind: usize,
    /// Single-cell correlation boost applied at the expected pitch-shift
    /// bin when resampling; see `spectrum_rescale_buffer`.
    pub pitch_estimate_boost: f32,
    /// Added, unnormalized, to `prev_spectrum` before cross-correlation.
    /// Upstream marks this "FIXME why does this exist?" — behavior is
    /// preserved as specified rather than second-guessed here.
    pub add_current_to_history: f32,
    pub max_octaves_to_resample: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            min_hz: 40.0,
            octaves: 7,
            notes_per_octave: 6,
            exponent: 1.0,
            divide_by_freq: true,
            min_frames_between_recompute: 6,
            frames_to_lookbehind: 2,
            pitch_estimate_boost: 1.2,
            add_current_to_history: 0.1,
            max_octaves_to_resample: 1.0,
        }
    }
}

impl SpectrumConfig {
    pub fn max_notes_to_resample(&self) -> i64 {
        (self.notes_per_octave as f32 * self.max_octaves_to_resample).round() as i64
    }
}

/// Computes a log-frequency-binned magnitude spectrum from a fixed-size
/// sample window. The FFT length is chosen at construction so every bin
/// spans at least one nonzero-width FFT bin (see `new`).
#[derive(Debug, Clone)]
pub struct LogFreqSpectrum {
    scfg: SpectrumConfig,
    fft: RealMagnitudeFft,
    bin_fenceposts: Vec<usize>,
    min_hz: f64,
    max_hz: f64,
}

impl LogFreqSpectrum {
    /// `subsmp_s` is the *subsampled* rate (`smp_s / stride`); `dummy_len`
    /// is the reference buffer length (`N`) the FFT will be sized around.
    pub fn new(scfg: SpectrumConfig, subsmp_s: f64, dummy_len: usize) -> Self {
        let mut n_fft = next_fast_len(dummy_len.saturating_sub(1).max(1));
        let min_hz = scfg.min_hz;
        let max_hz = min_hz * 2f64.powi(scfg.octaves as i32);
        let n_fencepost = (scfg.notes_per_octave * scfg.octaves + 1) as usize;

        let bin_fenceposts = loop {
            let fenceposts_hz = geomspace(min_hz, max_hz, n_fencepost);
            let fenceposts: Vec<usize> = fenceposts_hz
                .iter()
                .map(|&hz| ((hz * n_fft as f64) / subsmp_s).floor() as usize)
                .collect();

            let any_equal_adjacent = fenceposts.windows(2).any(|w| w[0] == w[1]);
            if any_equal_adjacent {
                n_fft = next_fast_len(n_fft + n_fft / 5 + 1);
                continue;
            }
            break fenceposts;
        };

        Self {
            scfg,
            fft: RealMagnitudeFft::new(n_fft),
            bin_fenceposts,
            min_hz,
            max_hz,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.fft.len()
    }

    pub fn min_hz(&self) -> f64 {
        self.min_hz
    }

    pub fn max_hz(&self) -> f64 {
        self.max_hz
    }

    /// Number of bins this spectrum would produce given an infinitely long
    /// FFT output (`bin_fenceposts.len() - 1`). The actual `calc_spectrum`
    /// result may be shorter: fenceposts at or beyond the FFT's output
    /// length are omitted, per the upstream "may return fewer bins" note.
    pub fn max_bin_count(&self) -> usize {
        self.bin_fenceposts.len().saturating_sub(1)
    }

    pub fn calc_spectrum(&self, data: &[f32]) -> Vec<f32> {
        let mut spectrum = self.fft.magnitude(data);
        if self.scfg.exponent != 1.0 {
            for v in &mut spectrum {
                *v = v.powf(self.scfg.exponent);
            }
        }

        let mut bins = Vec::with_capacity(self.bin_fenceposts.len().saturating_sub(1));
        for pair in self.bin_fenceposts.windows(2) {
            let (st, end) = (pair[0], pair[1]);
            if st >= spectrum.len() {
                break;
            }
            let end = end.min(spectrum.len());
            let region = &spectrum[st..end];
            if region.is_empty() {
                bins.push(0.0);
                continue;
            }
            let sum: f32 = region.iter().sum();
            bins.push(if self.scfg.divide_by_freq {
                sum / region.len() as f32
            } else {
                sum
            });
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_fenceposts_strictly_increasing() {
        let spectrum = LogFreqSpectrum::new(SpectrumConfig::default(), 48_000.0 / 4.0, 4800);
        for w in spectrum.bin_fenceposts.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert!(*spectrum.bin_fenceposts.last().unwrap() <= spectrum.n_fft() / 2 + 1);
    }

    #[test]
    fn calc_spectrum_never_exceeds_max_bin_count() {
        let spectrum = LogFreqSpectrum::new(SpectrumConfig::default(), 48_000.0 / 4.0, 4800);
        let data: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.1).sin()).collect();
        let bins = spectrum.calc_spectrum(&data);
        assert!(bins.len() <= spectrum.max_bin_count());
    }

    #[test]
    fn sine_spectrum_peaks_near_its_frequency_bin() {
        let scfg = SpectrumConfig {
            min_hz: 40.0,
            octaves: 7,
            notes_per_octave: 6,
            ..Default::default()
        };
        let subsmp_s = 48_000.0;
        let spectrum = LogFreqSpectrum::new(scfg.clone(), subsmp_s, 4096);
        let freq = 440.0f32;
        let data: Vec<f32> = (0..4096)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / subsmp_s as f32).sin())
            .collect();
        let bins = spectrum.calc_spectrum(&data);
        let (peak_idx, _) = bins
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap();

        // Note index for 440 Hz relative to min_hz=40: log2(440/40)*notes_per_octave.
        let expected = (440.0f64 / scfg.min_hz).log2() * scfg.notes_per_octave as f64;
        assert!(
            (peak_idx as f64 - expected).abs() <= 1.5,
            "peak_idx={peak_idx} expected~{expected}"
        );
    }

    #[test]
    fn max_notes_to_resample_rounds() {
        let scfg = SpectrumConfig {
            notes_per_octave: 6,
            max_octaves_to_resample: 1.0,
            ..Default::default()
        };
        assert_eq!(scfg.max_notes_to_resample(), 6);
    }
}
