//! The `WaveSource` external interface. Real audio file I/O is a host
//! responsibility; this module only defines the contract triggers consume,
//! plus `SliceWave`, a minimal in-memory implementation used by this
//! crate's own tests and as a worked example for integrators.

/// Supplies strided, centered sample windows to the trigger subsystem.
/// Implementations must zero-pad out-of-range reads rather than error —
/// `WaveOutOfRange` is handled here, not surfaced as a `TriggerError`.
pub trait WaveSource {
    /// Source sample rate, in samples per second.
    fn smp_s(&self) -> f64;

    /// Total number of samples in the source.
    fn nsamp(&self) -> i64;

    /// Sample at `index`, or `0.0` if out of range.
    fn at(&self, index: i64) -> f32;

    /// Returns `n` samples spaced `stride` apart, centered on `center`:
    /// `[center - (n/2)*stride, ..., center + (n - n/2 - 1)*stride]`
    /// stepping by `stride`. Out-of-range positions are zero. `stride` must
    /// be positive.
    fn get_around(&self, center: i64, n: usize, stride: u32) -> Vec<f32> {
        assert!(stride > 0, "stride must be positive, got {stride}");
        let stride = stride as i64;
        let half = (n / 2) as i64;
        let start = center - half * stride;
        (0..n as i64)
            .map(|i| self.at(start + i * stride))
            .collect()
    }
}

/// A `WaveSource` backed by an owned, in-memory sample buffer.
#[derive(Debug, Clone)]
pub struct SliceWave {
    samples: Vec<f32>,
    smp_s: f64,
}

impl SliceWave {
    pub fn new(samples: Vec<f32>, smp_s: f64) -> Self {
        Self { samples, smp_s }
    }
}

impl WaveSource for SliceWave {
    fn smp_s(&self) -> f64 {
        self.smp_s
    }

    fn nsamp(&self) -> i64 {
        self.samples.len() as i64
    }

    fn at(&self, index: i64) -> f32 {
        if index < 0 || index >= self.nsamp() {
            0.0
        } else {
            self.samples[index as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_around_zero_pads_out_of_range() {
        let wave = SliceWave::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], 48_000.0);
        let window = wave.get_around(0, 6, 1);
        // center=0, n=6, half=3: indices -3..=2
        assert_eq!(window, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn get_around_honors_stride() {
        let wave = SliceWave::new((0..20).map(|i| i as f32).collect(), 48_000.0);
        let window = wave.get_around(10, 4, 3);
        // half = 2, start = 10 - 2*3 = 4; indices 4,7,10,13
        assert_eq!(window, vec![4.0, 7.0, 10.0, 13.0]);
    }

    #[test]
    #[should_panic(expected = "stride must be positive")]
    fn zero_stride_panics() {
        let wave = SliceWave::new(vec![0.0; 4], 48_000.0);
        wave.get_around(0, 4, 0);
    }
}
