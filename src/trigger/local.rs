//! Post-trigger that refines a candidate index by correlating against an
//! edge-biased step function, penalized quadratically by distance from the
//! center (so bigger excursions are only taken when the correlation gain
//! is worth it).

use serde::{Deserialize, Serialize};

use crate::cache::TriggerFrameCache;
use crate::error::TriggerError;
use crate::math::{argmax, calc_step, correlate_full, hann};
use crate::wave::WaveSource;

use super::{AnyTriggerConfig, Trigger};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalPostTriggerConfig {
    pub strength: f64,
    /// Always `None`: a post-trigger cannot itself carry a nested post-trigger.
    /// Present only so [`AnyTriggerConfig::post`] has a uniform field to read.
    #[serde(default)]
    pub post: Option<Box<AnyTriggerConfig>>,
}

impl Default for LocalPostTriggerConfig {
    fn default() -> Self {
        Self {
            strength: 1.0,
            post: None,
        }
    }
}

#[derive(Debug)]
pub struct LocalPostTrigger {
    tsamp: usize,
    data_window: Vec<f32>,
    windowed_step: Vec<f32>,
    cost_norm: Vec<f32>,
}

impl LocalPostTrigger {
    pub fn new(cfg: &LocalPostTriggerConfig, tsamp: usize, stride: u32) -> Result<Self, TriggerError> {
        if stride != 1 {
            return Err(TriggerError::PostTriggerStride { stride });
        }
        if cfg.post.is_some() {
            return Err(TriggerError::NestedPostTrigger);
        }

        let n = tsamp;
        let cost_norm: Vec<f32> = (0..2 * n)
            .map(|k| {
                let d = k as f32 - n as f32;
                d * d
            })
            .collect();

        Ok(Self {
            tsamp: n,
            data_window: hann(n),
            windowed_step: calc_step(n, cfg.strength as f32, 1.0 / 3.0),
            cost_norm,
        })
    }
}

impl Trigger for LocalPostTrigger {
    fn get_trigger(
        &mut self,
        wave: &dyn WaveSource,
        index: i64,
        cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError> {
        let n = self.tsamp;
        let mean = cache.mean.ok_or(TriggerError::MissingPeriod)?;
        let period = cache.period.ok_or(TriggerError::MissingPeriod)?;

        let mut data = wave.get_around(index, n, 1);
        for v in data.iter_mut() {
            *v -= mean;
        }
        let peak = data.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
        let denom = peak.max(0.01);
        for v in data.iter_mut() {
            *v /= denom;
        }
        for (d, w) in data.iter_mut().zip(self.data_window.iter()) {
            *d *= w;
        }

        let mid = n - 1;
        let mut corr = correlate_full(&data, &self.windowed_step);
        if corr[mid] < 0.0 {
            return Ok(index);
        }

        let period = period.max(1) as f32;
        for (c, cost) in corr.iter_mut().zip(self.cost_norm.iter()) {
            *c -= cost / period;
        }

        let radius = n / 4;
        let lo = mid.saturating_sub(radius);
        let hi = (mid + radius + 1).min(corr.len());
        let window = &corr[lo..hi];
        let window_mid = mid - lo;
        let offset = argmax(window) as i64 - window_mid as i64;

        Ok(index + offset)
    }
}
