//! Post-trigger that scans for the nearest zero crossing in the direction
//! away from the current sample's sign. Cheap, cache-free, and most useful
//! stacked after a coarser primary trigger.

use serde::{Deserialize, Serialize};

use crate::cache::TriggerFrameCache;
use crate::error::TriggerError;
use crate::wave::WaveSource;

use super::{AnyTriggerConfig, Trigger};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroCrossingTriggerConfig {
    /// Always `None`: a post-trigger cannot itself carry a nested post-trigger.
    #[serde(default)]
    pub post: Option<Box<AnyTriggerConfig>>,
}

impl Default for ZeroCrossingTriggerConfig {
    fn default() -> Self {
        Self { post: None }
    }
}

#[derive(Debug)]
pub struct ZeroCrossingTrigger {
    tsamp: usize,
}

impl ZeroCrossingTrigger {
    pub fn new(cfg: &ZeroCrossingTriggerConfig, tsamp: usize, stride: u32) -> Result<Self, TriggerError> {
        if stride != 1 {
            return Err(TriggerError::PostTriggerStride { stride });
        }
        if cfg.post.is_some() {
            return Err(TriggerError::NestedPostTrigger);
        }
        Ok(Self { tsamp })
    }
}

impl Trigger for ZeroCrossingTrigger {
    fn get_trigger(
        &mut self,
        wave: &dyn WaveSource,
        index: i64,
        _cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError> {
        if index < 0 || index >= wave.nsamp() {
            return Ok(index);
        }

        let value = wave.at(index);
        if value == 0.0 {
            return Ok(index + 1);
        }

        let direction: i64 = if value < 0.0 { 1 } else { -1 };
        let test = |v: f32| if direction > 0 { v >= 0.0 } else { v <= 0.0 };

        for delta in 1..=self.tsamp as i64 {
            let i = index + delta * direction;
            let v = wave.at(i);
            if test(v) {
                let tie_break = if v <= 0.0 { 1 } else { 0 };
                return Ok(index + delta * direction + tie_break);
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::SliceWave;

    #[test]
    fn construction_rejects_nonunit_stride() {
        let cfg = ZeroCrossingTriggerConfig::default();
        let err = ZeroCrossingTrigger::new(&cfg, 1000, 2).unwrap_err();
        assert!(matches!(err, TriggerError::PostTriggerStride { stride: 2 }));
    }

    #[test]
    fn construction_rejects_nested_post() {
        let cfg = ZeroCrossingTriggerConfig {
            post: Some(Box::new(AnyTriggerConfig::Null(super::NullTriggerConfig))),
        };
        let err = ZeroCrossingTrigger::new(&cfg, 1000, 1).unwrap_err();
        assert!(matches!(err, TriggerError::NestedPostTrigger));
    }

    /// S2 — ZeroCrossing on impulse: impulse at sample 24000 of a
    /// 48000-sample buffer of zeros. Starting exactly on a zero sample
    /// always increments by one, regardless of direction.
    #[test]
    fn zero_crossing_on_impulse_finds_and_then_misses() {
        let mut samples = vec![0.0f32; 48_000];
        samples[24_000] = 1.0;
        let wave = SliceWave::new(samples, 48_000.0);
        let cfg = ZeroCrossingTriggerConfig::default();
        let mut trigger = ZeroCrossingTrigger::new(&cfg, 1000, 1).unwrap();
        let mut cache = TriggerFrameCache::new();

        assert_eq!(trigger.get_trigger(&wave, 23_999, &mut cache).unwrap(), 24_000);
        assert_eq!(trigger.get_trigger(&wave, 24_001, &mut cache).unwrap(), 24_002);
    }

    /// S3 — ZeroCrossing on a 100 Hz sine at 48 kHz; quarter-period-past-zero
    /// index should land within [479, 481].
    #[test]
    fn zero_crossing_on_sine_lands_near_expected_sample() {
        let freq = 100.0f32;
        let smp_s = 48_000.0f32;
        let samples: Vec<f32> = (0..48_000)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / smp_s).sin())
            .collect();
        let wave = SliceWave::new(samples, 48_000.0);
        let cfg = ZeroCrossingTriggerConfig::default();
        let mut trigger = ZeroCrossingTrigger::new(&cfg, 1000, 1).unwrap();
        let mut cache = TriggerFrameCache::new();

        let result = trigger.get_trigger(&wave, 240, &mut cache).unwrap();
        assert!((479..=481).contains(&result), "result={result}");
    }

    #[test]
    fn out_of_range_index_returned_unchanged() {
        let wave = SliceWave::new(vec![0.0; 100], 48_000.0);
        let cfg = ZeroCrossingTriggerConfig::default();
        let mut trigger = ZeroCrossingTrigger::new(&cfg, 10, 1).unwrap();
        let mut cache = TriggerFrameCache::new();
        assert_eq!(trigger.get_trigger(&wave, -5, &mut cache).unwrap(), -5);
        assert_eq!(trigger.get_trigger(&wave, 500, &mut cache).unwrap(), 500);
    }
}
