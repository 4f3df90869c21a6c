//! Math kernels shared by the trigger subsystem: FFT plumbing, linear
//! cross-correlation, window functions, interpolation and spacing helpers.
//! None of this is audio-domain specific; it exists so the trigger modules
//! read as plain signal-processing code.

pub mod correlate;
pub mod fft;
pub mod windows;

pub use correlate::correlate_full;
pub use fft::{RealMagnitudeFft, next_fast_len};
pub use windows::{
    calc_step, cosine_flat, gaussian, geomspace, hann, interp_linear, leftpad, lerp, linspace,
    midpad,
};

/// Index of the first (lowest-index) maximum in `xs`. Ties broken by
/// picking the earliest occurrence, matching `numpy.argmax`.
///
/// # Panics
/// Panics if `xs` is empty.
pub fn argmax(xs: &[f32]) -> usize {
    let mut best_idx = 0;
    let mut best_val = xs[0];
    for (i, &v) in xs.iter().enumerate().skip(1) {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_breaks_ties_with_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
    }
}
