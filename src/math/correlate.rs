//! Linear cross-correlation, computed via zero-padded real FFT rather than
//! a direct O(n²) loop, the way `openmeters` reaches for `realfft` for any
//! frequency-domain work rather than hand-rolling it.

use super::fft::next_fast_len;
use realfft::RealFftPlanner;

/// `correlate_full(a, b)` is equivalent to `scipy.signal.correlate(a, b,
/// mode="full")`: length `len(a) + len(b) - 1`, zero-lag at index
/// `len(a) - 1`. Equal to `convolve(a, reverse(b), "full")`.
pub fn correlate_full(a: &[f32], b: &[f32]) -> Vec<f32> {
    let (na, nb) = (a.len(), b.len());
    if na == 0 || nb == 0 {
        return Vec::new();
    }
    let out_len = na + nb - 1;
    let fft_len = next_fast_len(out_len);

    let mut planner = RealFftPlanner::<f32>::new();
    let fwd = planner.plan_fft_forward(fft_len);
    let inv = planner.plan_fft_inverse(fft_len);

    let mut a_buf = fwd.make_input_vec();
    a_buf[..na].copy_from_slice(a);

    let mut b_buf = fwd.make_input_vec();
    for (dst, src) in b_buf.iter_mut().zip(b.iter().rev()) {
        *dst = *src;
    }

    let mut a_spec = fwd.make_output_vec();
    let mut b_spec = fwd.make_output_vec();
    let mut scratch = fwd.make_scratch_vec();

    fwd.process_with_scratch(&mut a_buf, &mut a_spec, &mut scratch)
        .expect("rfft forward with correctly sized buffers cannot fail");
    fwd.process_with_scratch(&mut b_buf, &mut b_spec, &mut scratch)
        .expect("rfft forward with correctly sized buffers cannot fail");

    for (x, y) in a_spec.iter_mut().zip(b_spec.iter()) {
        *x *= y;
    }

    let mut conv = inv.make_output_vec();
    let mut inv_scratch = inv.make_scratch_vec();
    inv.process_with_scratch(&mut a_spec, &mut conv, &mut inv_scratch)
        .expect("irfft with correctly sized buffers cannot fail");

    let norm = 1.0 / fft_len as f32;
    conv.truncate(out_len);
    conv.iter().map(|x| x * norm).collect()
}
