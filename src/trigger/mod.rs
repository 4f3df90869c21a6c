//! The `Trigger` contract and its closed-set dispatch. At most two levels
//! are ever stacked: one primary trigger, optionally one post-trigger.
//! Modeling the trigger hierarchy as a closed enum (rather than a trait
//! object registry) makes the stacking rule an exhaustive match instead of
//! a runtime type check.

pub mod correlation;
pub mod local;
pub mod zero_crossing;

use crate::cache::TriggerFrameCache;
use crate::error::TriggerError;
use crate::wave::WaveSource;
use serde::{Deserialize, Serialize};

pub use correlation::{CorrelationTrigger, CorrelationTriggerConfig};
pub use local::{LocalPostTrigger, LocalPostTriggerConfig};
pub use zero_crossing::{ZeroCrossingTrigger, ZeroCrossingTriggerConfig};

/// Window length used for any trigger constructed purely as a post-trigger:
/// small and stride-1, since post-triggers only refine a nearby candidate.
pub const POST_PROCESSING_NSAMP: usize = 256;

/// `index` is a source-sample index; the returned index is chosen so that
/// rendering a window centered on it yields a visually stable frame.
/// `cache` is fresh at the primary trigger's entry and shared with any
/// post-trigger: the primary **must** populate `cache.mean` and
/// `cache.period` before invoking its post-trigger.
pub trait Trigger {
    fn get_trigger(
        &mut self,
        wave: &dyn WaveSource,
        index: i64,
        cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError>;
}

/// Returns `index` unchanged and never touches `cache`. Useful for channels
/// that need no triggering at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrigger;

impl Trigger for NullTrigger {
    fn get_trigger(
        &mut self,
        _wave: &dyn WaveSource,
        index: i64,
        _cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError> {
        Ok(index)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NullTriggerConfig;

/// A trigger, erased to one of the four kinds this crate knows how to
/// build. Exhaustive dispatch, no dynamic registry.
#[derive(Debug)]
pub enum AnyTrigger {
    Correlation(Box<CorrelationTrigger>),
    LocalPost(Box<LocalPostTrigger>),
    ZeroCrossing(Box<ZeroCrossingTrigger>),
    Null(NullTrigger),
}

impl Trigger for AnyTrigger {
    fn get_trigger(
        &mut self,
        wave: &dyn WaveSource,
        index: i64,
        cache: &mut TriggerFrameCache,
    ) -> Result<i64, TriggerError> {
        match self {
            AnyTrigger::Correlation(t) => t.get_trigger(wave, index, cache),
            AnyTrigger::LocalPost(t) => t.get_trigger(wave, index, cache),
            AnyTrigger::ZeroCrossing(t) => t.get_trigger(wave, index, cache),
            AnyTrigger::Null(t) => t.get_trigger(wave, index, cache),
        }
    }
}

/// Configuration for any of the four trigger kinds, plus the optional
/// nested post-trigger every trigger config can (in principle) carry — only
/// [`LocalPostTriggerConfig`] and [`ZeroCrossingTriggerConfig`] reject being
/// constructed with one set, since a post-trigger may not itself stack
/// another post-trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyTriggerConfig {
    Correlation(CorrelationTriggerConfig),
    LocalPost(LocalPostTriggerConfig),
    ZeroCrossing(ZeroCrossingTriggerConfig),
    Null(NullTriggerConfig),
}

impl AnyTriggerConfig {
    /// The nested post-trigger config carried by this variant, if any.
    pub fn post(&self) -> Option<&AnyTriggerConfig> {
        match self {
            AnyTriggerConfig::Correlation(c) => c.post.as_deref(),
            AnyTriggerConfig::LocalPost(c) => c.post.as_deref(),
            AnyTriggerConfig::ZeroCrossing(c) => c.post.as_deref(),
            AnyTriggerConfig::Null(_) => None,
        }
    }

    /// Builds the trigger tree this config describes: the primary trigger,
    /// and recursively its post-trigger if one is configured.
    ///
    /// `tsamp`/`stride` apply to this (the outermost) trigger; any nested
    /// post-trigger is always built with `(POST_PROCESSING_NSAMP, 1)`,
    /// matching how `ChannelBinding` constructs the top-level trigger and
    /// how every trigger constructs its own post-trigger.
    pub fn build(
        &self,
        tsamp: usize,
        stride: u32,
        fps: f64,
        smp_s: f64,
    ) -> Result<AnyTrigger, TriggerError> {
        match self {
            AnyTriggerConfig::Correlation(cfg) => Ok(AnyTrigger::Correlation(Box::new(
                CorrelationTrigger::new(cfg, tsamp, stride, fps, smp_s)?,
            ))),
            AnyTriggerConfig::LocalPost(cfg) => Ok(AnyTrigger::LocalPost(Box::new(
                LocalPostTrigger::new(cfg, tsamp, stride)?,
            ))),
            AnyTriggerConfig::ZeroCrossing(cfg) => Ok(AnyTrigger::ZeroCrossing(Box::new(
                ZeroCrossingTrigger::new(cfg, tsamp, stride)?,
            ))),
            AnyTriggerConfig::Null(_) => Ok(AnyTrigger::Null(NullTrigger)),
        }
    }

    /// Builds this config's post-trigger, if any, at the fixed
    /// post-processing window size and stride.
    fn build_post(&self, fps: f64, smp_s: f64) -> Result<Option<Box<AnyTrigger>>, TriggerError> {
        match self.post() {
            None => Ok(None),
            Some(post_cfg) => Ok(Some(Box::new(post_cfg.build(
                POST_PROCESSING_NSAMP,
                1,
                fps,
                smp_s,
            )?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::SliceWave;

    #[test]
    fn null_trigger_returns_input_unchanged() {
        let wave = SliceWave::new(vec![0.0; 48_000], 48_000.0);
        let mut trigger = NullTrigger;
        let mut cache = TriggerFrameCache::new();
        assert_eq!(trigger.get_trigger(&wave, 12345, &mut cache).unwrap(), 12345);
        assert!(cache.mean.is_none());
        assert!(cache.period.is_none());
    }

    #[test]
    fn any_trigger_config_builds_null() {
        let cfg = AnyTriggerConfig::Null(NullTriggerConfig);
        let trigger = cfg.build(100, 1, 60.0, 48_000.0).unwrap();
        assert!(matches!(trigger, AnyTrigger::Null(_)));
    }
}
