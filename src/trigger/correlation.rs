//! The primary trigger: a stateful, pitch-invariant correlation search
//! against an evolving reference buffer. Everything else in this crate
//! exists to support this one algorithm.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::cache::TriggerFrameCache;
use crate::circular::CircularArray;
use crate::error::TriggerError;
use crate::math::{
    argmax, calc_step, correlate_full, cosine_flat, gaussian, hann, interp_linear, leftpad, lerp,
    linspace, midpad,
};
use crate::spectrum::{LogFreqSpectrum, SpectrumConfig};
use crate::wave::WaveSource;

use super::zero_crossing::ZeroCrossingTriggerConfig;
use super::{AnyTrigger, AnyTriggerConfig, POST_PROCESSING_NSAMP, Trigger};

/// Edge-falloff shape for the correlation window: `(diameter_ratio,
/// falloff_ratio)`, each multiplied by `period` to get sample counts.
pub type TriggerFalloff = (f64, f64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationTriggerConfig {
    pub edge_strength: f64,
    pub trigger_diameter: Option<f64>,
    pub trigger_falloff: TriggerFalloff,
    pub recalc_semitones: f64,
    pub lag_prevention: f64,
    pub responsiveness: f64,
    pub buffer_falloff: f64,
    pub pitch_invariance: Option<SpectrumConfig>,
    pub post: Option<Box<AnyTriggerConfig>>,
    /// Legacy flag: if set and `post` is absent, defaults `post` to a
    /// [`ZeroCrossingTriggerConfig`]; if set and `post` is present, ignored
    /// with a warning rather than silently dropped.
    pub use_edge_trigger: bool,
}

impl Default for CorrelationTriggerConfig {
    fn default() -> Self {
        Self {
            edge_strength: 2.0,
            trigger_diameter: None,
            trigger_falloff: (4.0, 1.0),
            recalc_semitones: 1.0,
            lag_prevention: 0.25,
            responsiveness: 0.5,
            buffer_falloff: 0.5,
            pitch_invariance: None,
            post: None,
            use_edge_trigger: false,
        }
    }
}

impl CorrelationTriggerConfig {
    fn validate(&self) -> Result<(), TriggerError> {
        if self.edge_strength < 0.0 {
            return Err(TriggerError::ParamOutOfRange {
                name: "edge_strength",
                value: self.edge_strength,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if let Some(d) = self.trigger_diameter {
            if !(0.0..=1.0).contains(&d) || d == 0.0 {
                return Err(TriggerError::ParamOutOfRange {
                    name: "trigger_diameter",
                    value: d,
                    min: f64::EPSILON,
                    max: 1.0,
                });
            }
        }
        if self.recalc_semitones < 0.0 {
            return Err(TriggerError::ParamOutOfRange {
                name: "recalc_semitones",
                value: self.recalc_semitones,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if !(0.0..=1.0).contains(&self.lag_prevention) {
            return Err(TriggerError::ParamOutOfRange {
                name: "lag_prevention",
                value: self.lag_prevention,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.responsiveness) {
            return Err(TriggerError::ParamOutOfRange {
                name: "responsiveness",
                value: self.responsiveness,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.buffer_falloff < 0.0 {
            return Err(TriggerError::ParamOutOfRange {
                name: "buffer_falloff",
                value: self.buffer_falloff,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(())
    }

    /// Resolves the `post` this config actually builds with, applying the
    /// legacy `use_edge_trigger` fallback.
    fn resolved_post(&self) -> Option<AnyTriggerConfig> {
        match (&self.post, self.use_edge_trigger) {
            (Some(post), true) => {
                warn!("use_edge_trigger is ignored because an explicit post-trigger is set");
                Some((**post).clone())
            }
            (Some(post), false) => Some((**post).clone()),
            (None, true) => Some(AnyTriggerConfig::ZeroCrossing(ZeroCrossingTriggerConfig::default())),
            (None, false) => None,
        }
    }
}

/// Non-negative offset a semitone shift is invalid past; see
/// [`CorrelationTrigger::is_window_invalid`].
enum WindowValidity {
    FirstEver,
    Unchanged,
    Changed(f64),
}

/// Stateful, pitch-invariant correlation trigger. Owns a reference buffer
/// that slowly tracks the signal's recent waveform shape; each frame,
/// slides the incoming window against it (biased towards a rising edge)
/// to find the offset that best realigns the new data with the reference.
#[derive(Debug)]
pub struct CorrelationTrigger {
    cfg: CorrelationTriggerConfig,
    tsamp: usize,
    stride: u32,

    buffer: Vec<f32>,
    data_taper: Vec<f32>,
    windowed_step: Vec<f32>,

    prev_period: Option<i64>,
    prev_window: Vec<f32>,

    spectrum_calc: Option<LogFreqSpectrum>,
    spectrum: Vec<f32>,
    history: CircularArray,
    frames_since_spectrum: u32,

    post: Option<Box<AnyTrigger>>,
}

impl CorrelationTrigger {
    pub fn new(
        cfg: &CorrelationTriggerConfig,
        tsamp: usize,
        stride: u32,
        fps: f64,
        smp_s: f64,
    ) -> Result<Self, TriggerError> {
        cfg.validate()?;
        let cfg = cfg.clone();
        let n = tsamp;

        let real_samp_frame = smp_s / fps;
        let tsamp_frame = (smp_s / (fps * stride as f64)).round() as usize;
        let data_taper = calc_data_taper(n, real_samp_frame, tsamp_frame, cfg.lag_prevention);

        let windowed_step = calc_step(n, (cfg.edge_strength * cfg.buffer_falloff) as f32, 1.0 / 3.0);

        let subsmp_s = smp_s / stride as f64;
        let spectrum_calc = cfg
            .pitch_invariance
            .clone()
            .map(|scfg| LogFreqSpectrum::new(scfg, subsmp_s, n));

        let history_depth = cfg
            .pitch_invariance
            .as_ref()
            .map(|s| s.frames_to_lookbehind)
            .unwrap_or(0);

        let post = match cfg.resolved_post() {
            None => None,
            Some(post_cfg) => Some(Box::new(post_cfg.build(POST_PROCESSING_NSAMP, 1, fps, smp_s)?)),
        };

        debug!(tsamp = n, stride, "CorrelationTrigger constructed");

        Ok(Self {
            buffer: vec![0.0; n],
            data_taper,
            windowed_step,
            prev_period: None,
            prev_window: vec![0.0; n],
            spectrum_calc,
            spectrum: Vec::new(),
            history: CircularArray::new(history_depth, n),
            frames_since_spectrum: 0,
            post,
            cfg,
            tsamp,
            stride,
        })
    }

    fn n(&self) -> usize {
        self.tsamp
    }

    /// Step 4 of the per-frame algorithm: decide whether `period` differs
    /// enough from `prev_period` to warrant recomputing the window.
    fn is_window_invalid(&self, period: i64) -> WindowValidity {
        let Some(prev) = self.prev_period else {
            return WindowValidity::FirstEver;
        };
        if prev == 0 || period == 0 {
            return if prev != period {
                WindowValidity::Changed(f64::NAN)
            } else {
                WindowValidity::Unchanged
            };
        }
        let semitones = -12.0 * (period as f64 / prev as f64).log2();
        if semitones.abs() <= self.cfg.recalc_semitones {
            WindowValidity::Unchanged
        } else {
            WindowValidity::Changed(semitones)
        }
    }

    /// Autocorrelation-based period estimator (§4.2.1): first zero-crossing
    /// of the non-negative-lag half of the autocorrelation, then the argmax
    /// past it. Falls back to `data.len()` for degenerate (e.g. all-zero)
    /// input.
    fn get_period(data: &[f32]) -> i64 {
        let n = data.len();
        if n == 0 {
            return 0;
        }
        let full = correlate_full(data, data);
        let mid = n - 1;
        let half = &full[mid..];
        let cross = half.iter().position(|&v| v < 0.0);
        match cross {
            Some(cross_x) => (cross_x + argmax(&half[cross_x..])) as i64,
            None => n as i64,
        }
    }

    /// Finds the offset that best aligns `data` with `reference` (§4.2.2).
    /// `radius` restricts the search window around zero lag; a single cell
    /// at `mid + boost_x` is multiplied by `boost_y` before the argmax.
    fn correlate_offset(
        data: &[f32],
        reference: &[f32],
        radius: Option<usize>,
        boost_x: i64,
        boost_y: f32,
    ) -> i64 {
        let n = data.len();
        let mut corr = correlate_full(data, reference);
        let mid = (n - 1) as i64;

        let (lo, hi) = match radius {
            Some(r) => (
                (mid - r as i64).max(0),
                (mid + r as i64 + 1).min(corr.len() as i64),
            ),
            None => (0, corr.len() as i64),
        };

        let boosted_index = mid + boost_x;
        if boosted_index >= 0 && (boosted_index as usize) < corr.len() {
            corr[boosted_index as usize] *= boost_y;
        }

        let window = &corr[lo as usize..hi as usize];
        let window_mid = mid - lo;
        argmax(window) as i64 - window_mid
    }

    /// §4.2.3 reference-buffer update.
    fn update_buffer(&mut self, data: &[f32], cache: &TriggerFrameCache) -> Result<(), TriggerError> {
        let n = self.n();
        if data.len() != n {
            return Err(TriggerError::InvalidDataLength {
                got: data.len(),
                expected: n,
            });
        }
        let mean = cache.mean.ok_or(TriggerError::MissingPeriod)?;
        let period = cache.period.ok_or(TriggerError::MissingPeriod)?;

        let mut data: Vec<f32> = data.iter().map(|&v| v - mean).collect();
        normalize_buffer(&mut data);

        let std = (period as f64 / self.stride as f64) * self.cfg.buffer_falloff;
        let envelope = gaussian(n, std as f32);
        for (d, w) in data.iter_mut().zip(envelope.iter()) {
            *d *= w;
        }

        normalize_buffer(&mut self.buffer);

        let responsiveness = self.cfg.responsiveness as f32;
        self.buffer = lerp(&self.buffer, &data, responsiveness);
        Ok(())
    }

    /// §4.2.4 pitch-invariance resample, gated by `min_frames_between_recompute`.
    fn spectrum_rescale_buffer(&mut self, data: &[f32], peak_semitones: Option<f64>) {
        let Some(spectrum_calc) = self.spectrum_calc.clone() else {
            return;
        };
        let min_frames = match &self.cfg.pitch_invariance {
            Some(s) => s.min_frames_between_recompute,
            None => return,
        };
        if self.frames_since_spectrum < min_frames {
            return;
        }
        self.frames_since_spectrum = 0;

        let mut spectrum = spectrum_calc.calc_spectrum(data);
        normalize_buffer(&mut spectrum);

        let mut prev_spectrum = spectrum_calc.calc_spectrum(self.history.peek());
        let add_current = self
            .cfg
            .pitch_invariance
            .as_ref()
            .map(|s| s.add_current_to_history)
            .unwrap_or(0.0);
        let len = prev_spectrum.len().min(spectrum.len());
        for i in 0..len {
            prev_spectrum[i] += add_current * spectrum[i];
        }

        debug_assert!(spectrum.iter().all(|v| !v.is_nan()));
        self.spectrum = spectrum.clone();

        let notes_per_octave = self
            .cfg
            .pitch_invariance
            .as_ref()
            .map(|s| s.notes_per_octave)
            .unwrap_or(1);
        let (boost_x, boost_y) = match peak_semitones {
            Some(semitones) if !semitones.is_nan() => (
                (semitones / 12.0 * notes_per_octave as f64).round() as i64,
                scfg_pitch_boost(&self.cfg),
            ),
            _ => (0, 1.0),
        };

        let max_notes = self
            .cfg
            .pitch_invariance
            .as_ref()
            .map(|s| s.max_notes_to_resample())
            .unwrap_or(0);
        let resample_notes =
            Self::correlate_offset(&spectrum, &prev_spectrum, Some(max_notes.max(0) as usize), boost_x, boost_y);

        trace!(resample_notes, "spectrum cross-correlation offset");
        if resample_notes != 0 {
            let n = self.n();
            let new_len = (n as f64 / 2f64.powf(resample_notes as f64 / notes_per_octave as f64))
                .round()
                .max(1.0) as usize;
            let xs_old = linspace(0.0, 1.0, n);
            let xs_new = linspace(0.0, 1.0, new_len);
            let resampled = interp_linear(&xs_new, &xs_old, &self.buffer);
            self.buffer = midpad(&resampled, n);
        }
    }
}

/// Input data window: a Hann cosine taper (rather than a hard cutoff) that
/// suppresses data older than one frame in the left half of the buffer. The
/// transition width is keyed to one frame (`real_samp_frame * lag_prevention`,
/// clamped to `tsamp_frame`), not a fixed fraction of the whole buffer.
fn calc_data_taper(n: usize, real_samp_frame: f64, tsamp_frame: usize, lag_prevention: f64) -> Vec<f32> {
    let half_n = n / 2;
    let transition_nsamp = (real_samp_frame * lag_prevention).round() as usize;
    let width = transition_nsamp.min(tsamp_frame);

    // Left half of a Hann cosine taper, right-padded with 1s to one frame long.
    let mut taper = hann(width * 2);
    taper.truncate(width);
    if width < tsamp_frame {
        taper.resize(tsamp_frame, 1.0);
    }
    debug_assert_eq!(taper.len(), tsamp_frame);

    // Left-pad with 0s to the left half of the N-sample buffer.
    let taper = leftpad(&taper, half_n);

    let mut data_taper = vec![1.0f32; n];
    for (slot, &t) in data_taper[..half_n].iter_mut().zip(taper.iter()) {
        *slot = slot.min(t);
    }
    data_taper
}

fn scfg_pitch_boost(cfg: &CorrelationTriggerConfig) -> f32 {
    cfg.pitch_invariance
        .as_ref()
        .map(|s| s.pitch_estimate_boost)
        .unwrap_or(1.0)
}

/// Divides in place by `max(max |x|, 0.01)`, keeping values on a comparable
/// scale without blowing up on near-silent input.
fn normalize_buffer(data: &mut [f32]) {
    let peak = data.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
    let denom = peak.max(0.01);
    for v in data.iter_mut() {
        *v /= denom;
    }
}

impl Trigger for CorrelationTrigger {
    fn get_trigger(
        &mut self,
        wave: &dyn WaveSource,
        index: i64,
        cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError> {
        let n = self.n();

        // 1. Fetch.
        let mut data = wave.get_around(index, n, self.stride);

        // 2. DC removal.
        let mean: f32 = data.iter().sum::<f32>() / data.len().max(1) as f32;
        cache.mean = Some(mean);
        for v in data.iter_mut() {
            *v -= mean;
        }

        // 3. Period estimate.
        let period = Self::get_period(&data);
        cache.period = Some(period * self.stride as i64);

        // 4. Window selection.
        match self.is_window_invalid(period) {
            WindowValidity::Unchanged => {}
            validity => {
                let diameter = (period as f64 * self.cfg.trigger_falloff.0).round().max(0.0) as usize;
                let falloff = (period as f64 * self.cfg.trigger_falloff.1).round().max(0.0) as usize;
                let flat = cosine_flat(n, diameter, falloff);
                let window: Vec<f32> = flat
                    .iter()
                    .zip(self.data_taper.iter())
                    .map(|(&a, &b)| a.min(b))
                    .collect();
                self.prev_window = window;
                self.prev_period = Some(period);

                if self.spectrum_calc.is_some() && data.iter().any(|&v| v != 0.0) {
                    let peak_semitones = match validity {
                        WindowValidity::Changed(s) => Some(s),
                        _ => None,
                    };
                    self.spectrum_rescale_buffer(&data, peak_semitones);
                }
            }
        }

        // 5. History (raw data, before windowing).
        self.history.push(&data);

        // 6. Window data.
        for (d, w) in data.iter_mut().zip(self.prev_window.iter()) {
            *d *= w;
        }

        // 7. Reference + step.
        let prev_buffer: Vec<f32> = self
            .buffer
            .iter()
            .zip(self.windowed_step.iter())
            .map(|(&b, &s)| b + s)
            .collect();

        // 8. Correlation peak search.
        let radius = self
            .cfg
            .trigger_diameter
            .map(|d| (n as f64 * d / 2.0).round() as usize);
        let peak_offset = Self::correlate_offset(&data, &prev_buffer, radius, 0, 1.0);

        // 9. Provisional trigger.
        let mut trigger = index + self.stride as i64 * peak_offset;

        // 10. Post-trigger.
        if let Some(post) = &mut self.post {
            trigger = post.get_trigger(wave, trigger, cache)?;
        }

        // 11. Buffer update.
        let aligned = wave.get_around(trigger, n, self.stride);
        self.update_buffer(&aligned, cache)?;

        // 12.
        self.frames_since_spectrum += 1;
        Ok(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::SliceWave;

    fn square_wave(period: usize, repeats: usize) -> Vec<f32> {
        (0..period * repeats)
            .map(|i| if (i % period) < period / 2 { 1.0 } else { -1.0 })
            .collect()
    }

    #[test]
    fn get_period_of_square_wave_matches_period() {
        let data = square_wave(100, 4);
        let period = CorrelationTrigger::get_period(&data);
        assert!((period - 100).abs() <= 1, "period={period}");
    }

    #[test]
    fn get_period_of_all_zero_returns_length() {
        let data = vec![0.0f32; 64];
        assert_eq!(CorrelationTrigger::get_period(&data), 64);
    }

    #[test]
    fn correlate_offset_zero_for_identical_signals() {
        let data: Vec<f32> = (0..50).map(|i| (i as f32 * 0.3).sin()).collect();
        let offset = CorrelationTrigger::correlate_offset(&data, &data, None, 0, 1.0);
        assert_eq!(offset, 0);
    }

    #[test]
    fn data_taper_is_one_past_halfway_and_monotonic_before_it() {
        let taper = calc_data_taper(480, 800.0, 200, 0.25);
        let half_n = 480 / 2;
        for &v in &taper[half_n..] {
            assert_eq!(v, 1.0);
        }
        for w in taper[..half_n].windows(2) {
            assert!(w[1] + 1e-6 >= w[0], "not monotonic: {:?}", w);
        }
    }

    #[test]
    fn data_taper_transition_width_tracks_frame_not_whole_buffer() {
        // transition_nsamp = round(800 * 0.25) = 200, clamped to tsamp_frame = 200.
        let narrow = calc_data_taper(4800, 800.0, 200, 0.25);
        // A much larger buffer with the same frame size should have the same
        // transition width, not one scaled to the bigger buffer.
        let wide = calc_data_taper(9600, 800.0, 200, 0.25);
        let narrow_zeros = narrow.iter().take_while(|&&v| v == 0.0).count();
        let wide_zeros = wide.iter().take_while(|&&v| v == 0.0).count();
        assert_eq!(wide_zeros - narrow_zeros, (9600 - 4800) / 2);
    }

    #[test]
    fn construction_rejects_negative_edge_strength() {
        let cfg = CorrelationTriggerConfig {
            edge_strength: -1.0,
            ..Default::default()
        };
        let err = CorrelationTrigger::new(&cfg, 4800, 1, 60.0, 48_000.0).unwrap_err();
        assert!(matches!(err, TriggerError::ParamOutOfRange { name: "edge_strength", .. }));
    }

    #[test]
    fn construction_rejects_out_of_range_responsiveness() {
        let cfg = CorrelationTriggerConfig {
            responsiveness: 1.5,
            ..Default::default()
        };
        let err = CorrelationTrigger::new(&cfg, 4800, 1, 60.0, 48_000.0).unwrap_err();
        assert!(matches!(err, TriggerError::ParamOutOfRange { name: "responsiveness", .. }));
    }

    #[test]
    fn idempotence_under_silence() {
        let cfg = CorrelationTriggerConfig::default();
        let mut trigger = CorrelationTrigger::new(&cfg, 480, 1, 60.0, 48_000.0).unwrap();
        let wave = SliceWave::new(vec![0.0; 48_000], 48_000.0);
        let mut cache = TriggerFrameCache::new();
        let result = trigger.get_trigger(&wave, 24_000, &mut cache).unwrap();
        assert_eq!(result, 24_000);
        assert!(trigger.buffer.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn correlation_lock_on_square_wave() {
        let period = 100usize;
        let data = square_wave(period, 480);
        let wave = SliceWave::new(data, 48_000.0);

        let cfg = CorrelationTriggerConfig {
            responsiveness: 0.5,
            edge_strength: 2.0,
            buffer_falloff: 0.5,
            ..Default::default()
        };
        let n = 4800usize;
        let real_samp_frame = (48_000.0 / 60.0).round() as i64;
        let mut trigger = CorrelationTrigger::new(&cfg, n, 1, 60.0, 48_000.0).unwrap();

        let mut index = (n / 2) as i64;
        let mut cache = TriggerFrameCache::new();
        let t0 = trigger.get_trigger(&wave, index, &mut cache).unwrap();

        let mut locked = Vec::new();
        for _ in 0..10 {
            index += real_samp_frame;
            let mut cache = TriggerFrameCache::new();
            locked.push(trigger.get_trigger(&wave, index, &mut cache).unwrap());
        }

        let expected_phase = t0.rem_euclid(period as i64);
        for &t in &locked[2..] {
            let phase = t.rem_euclid(period as i64);
            assert!(
                (phase - expected_phase).abs() <= 1
                    || (phase - expected_phase).abs() >= period as i64 - 1,
                "phase={phase} expected~{expected_phase}"
            );
        }
    }

    #[test]
    fn window_invalidates_on_octave_jump() {
        let cfg = CorrelationTriggerConfig::default();
        let trigger = CorrelationTrigger::new(&cfg, 480, 1, 60.0, 48_000.0).unwrap();
        let mut t = trigger;
        t.prev_period = Some(100);
        match t.is_window_invalid(200) {
            WindowValidity::Changed(semitones) => {
                assert!((semitones - (-12.0)).abs() < 1e-6, "semitones={semitones}");
            }
            _ => panic!("expected Changed"),
        }
    }

    #[test]
    fn window_stable_within_recalc_semitones() {
        let cfg = CorrelationTriggerConfig {
            recalc_semitones: 1.0,
            ..Default::default()
        };
        let mut t = CorrelationTrigger::new(&cfg, 480, 1, 60.0, 48_000.0).unwrap();
        t.prev_period = Some(100);
        assert!(matches!(t.is_window_invalid(106), WindowValidity::Unchanged));
    }

    #[test]
    fn use_edge_trigger_legacy_defaults_to_zero_crossing_post() {
        let cfg = CorrelationTriggerConfig {
            use_edge_trigger: true,
            ..Default::default()
        };
        let trigger = CorrelationTrigger::new(&cfg, 480, 1, 60.0, 48_000.0).unwrap();
        assert!(matches!(trigger.post.as_deref(), Some(AnyTrigger::ZeroCrossing(_))));
    }
}
