//! Window functions, padding, spacing and interpolation helpers — the
//! small numeric vocabulary `CorrelationTrigger` and `LogFreqSpectrum` are
//! built from. Semantics match their `scipy`/`numpy` counterparts.

use std::f32::consts::PI;

/// Symmetric Hann window of length `n` (matches `scipy.signal.windows.hann`
/// with `sym=True`).
pub fn hann(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}

/// Symmetric Gaussian window of length `n` with standard deviation `std`
/// (matches `scipy.signal.windows.gaussian`).
pub fn gaussian(n: usize, std: f32) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let center = (n - 1) as f32 / 2.0;
    let std = std.max(1e-9);
    (0..n)
        .map(|i| {
            let t = (i as f32 - center) / std;
            (-0.5 * t * t).exp()
        })
        .collect()
}

/// A flat top of `diameter` ones with a Hann falloff of `falloff` samples
/// on each side, midpadded to length `n`.
pub fn cosine_flat(n: usize, diameter: usize, falloff: usize) -> Vec<f32> {
    let cosine = hann(falloff * 2);
    let (left, right) = cosine.split_at(falloff.min(cosine.len()));
    let mut window = Vec::with_capacity(left.len() + diameter + right.len());
    window.extend_from_slice(left);
    window.extend(std::iter::repeat_n(1.0f32, diameter));
    window.extend_from_slice(right);
    midpad(&window, n)
}

/// Centers `data` within a length-`n` buffer, zero-padding (or symmetrically
/// cropping, if `data` is longer than `n`). When the pad/crop amount is odd,
/// the extra sample goes on the right.
pub fn midpad(data: &[f32], n: usize) -> Vec<f32> {
    let len = data.len();
    if len == n {
        return data.to_vec();
    }
    if len < n {
        let pad = n - len;
        let left = pad / 2;
        let mut out = vec![0.0f32; n];
        out[left..left + len].copy_from_slice(data);
        out
    } else {
        let crop = len - n;
        let left = crop / 2;
        data[left..left + n].to_vec()
    }
}

/// Left-zero-pads `data` to length `n`. If `data` is already at least `n`
/// samples long, the leftmost `n` samples are kept.
pub fn leftpad(data: &[f32], n: usize) -> Vec<f32> {
    let len = data.len();
    if len >= n {
        return data[len - n..].to_vec();
    }
    let mut out = vec![0.0f32; n];
    out[n - len..].copy_from_slice(data);
    out
}

/// `n` evenly spaced values in `[start, end]` inclusive (matches
/// `numpy.linspace`).
pub fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f32;
    (0..n).map(|i| start + step * i as f32).collect()
}

/// `n` geometrically spaced values in `[start, end]` inclusive (matches
/// `numpy.geomspace`). Computed in `f64` since fencepost placement is
/// sensitive to rounding near bin boundaries.
pub fn geomspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![start];
    }
    let log_start = start.ln();
    let log_end = end.ln();
    let step = (log_end - log_start) / (n - 1) as f64;
    (0..n).map(|i| (log_start + step * i as f64).exp()).collect()
}

/// 1-D linear interpolation with flat extrapolation at the ends (matches
/// `numpy.interp`). Assumes `xs_old` is sorted ascending.
pub fn interp_linear(xs_new: &[f32], xs_old: &[f32], ys_old: &[f32]) -> Vec<f32> {
    xs_new.iter().map(|&x| interp_one(x, xs_old, ys_old)).collect()
}

fn interp_one(x: f32, xs: &[f32], ys: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let idx = match xs.binary_search_by(|v| v.partial_cmp(&x).unwrap()) {
        Ok(i) => return ys[i],
        Err(i) => i,
    };
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    let t = (x - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}

/// Antisymmetric step function used for approximate edge triggering:
/// `-peak/2` on the left half, `+peak/2` on the right half, shaped by a
/// Gaussian envelope with `std = (n/2) * std_ratio`.
pub fn calc_step(n: usize, peak: f32, std_ratio: f32) -> Vec<f32> {
    let half_n = n / 2;
    let mut step = vec![0.0f32; n];
    for v in &mut step[..half_n] {
        *v = -peak / 2.0;
    }
    for v in &mut step[half_n..] {
        *v = peak / 2.0;
    }
    let envelope = gaussian(n, half_n as f32 * std_ratio);
    for (s, e) in step.iter_mut().zip(envelope.iter()) {
        *s *= e;
    }
    step
}

/// Elementwise `x * (1 - a) + y * a`.
pub fn lerp(x: &[f32], y: &[f32], a: f32) -> Vec<f32> {
    x.iter()
        .zip(y.iter())
        .map(|(&xv, &yv)| xv * (1.0 - a) + yv * a)
        .collect()
}
