//! Per-channel parameter derivation and trigger-tree construction:
//! resolves the global/per-channel configuration split into concrete
//! window sizes and strides, and merges (or accepts verbatim) the
//! per-channel trigger configuration before building it.

use serde::{Deserialize, Serialize};

use crate::error::TriggerError;
use crate::trigger::{AnyTrigger, AnyTriggerConfig, CorrelationTriggerConfig};

/// Options shared by every channel unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub trigger_ms: f64,
    pub render_ms: f64,
    pub trigger_subsampling: u32,
    pub render_subsampling: u32,
    pub trigger_width: u32,
    pub render_width: u32,
    pub amplification: f64,
    pub fps: f64,
    pub trigger: AnyTriggerConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            trigger_ms: 40.0,
            render_ms: 40.0,
            trigger_subsampling: 1,
            render_subsampling: 1,
            trigger_width: 1,
            render_width: 1,
            amplification: 1.0,
            fps: 60.0,
            trigger: AnyTriggerConfig::Correlation(CorrelationTriggerConfig::default()),
        }
    }
}

/// A per-channel override of just the fields a host is likely to want to
/// tweak per channel. Restricted to [`CorrelationTriggerConfig`]'s fields
/// (rather than a fully generic field-map merge over any trigger kind)
/// since that is the only trigger this crate expects channels to override
/// in practice; see `DESIGN.md`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationTriggerOverride {
    pub edge_strength: Option<f64>,
    pub trigger_diameter: Option<Option<f64>>,
    pub trigger_falloff: Option<(f64, f64)>,
    pub recalc_semitones: Option<f64>,
    pub lag_prevention: Option<f64>,
    pub responsiveness: Option<f64>,
    pub buffer_falloff: Option<f64>,
}

impl CorrelationTriggerOverride {
    /// Merges this override onto `base` field by field, leaving any unset
    /// field at `base`'s value.
    pub fn apply(&self, base: &CorrelationTriggerConfig) -> CorrelationTriggerConfig {
        let mut merged = base.clone();
        if let Some(v) = self.edge_strength {
            merged.edge_strength = v;
        }
        if let Some(v) = self.trigger_diameter {
            merged.trigger_diameter = v;
        }
        if let Some(v) = self.trigger_falloff {
            merged.trigger_falloff = v;
        }
        if let Some(v) = self.recalc_semitones {
            merged.recalc_semitones = v;
        }
        if let Some(v) = self.lag_prevention {
            merged.lag_prevention = v;
        }
        if let Some(v) = self.responsiveness {
            merged.responsiveness = v;
        }
        if let Some(v) = self.buffer_falloff {
            merged.buffer_falloff = v;
        }
        merged
    }
}

/// A channel's trigger configuration: fully specified, a partial override
/// merged onto the global trigger config, or absent (global config used
/// verbatim).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChannelTriggerSpec {
    Full(AnyTriggerConfig),
    Override(CorrelationTriggerOverride),
    Absent,
}

impl Default for ChannelTriggerSpec {
    fn default() -> Self {
        ChannelTriggerSpec::Absent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub trigger: ChannelTriggerSpec,
    pub trigger_width: Option<u32>,
    pub render_width: Option<u32>,
    pub ampl_ratio: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            trigger: ChannelTriggerSpec::Absent,
            trigger_width: None,
            render_width: None,
            ampl_ratio: 1.0,
        }
    }
}

impl ChannelConfig {
    /// Resolves this channel's trigger configuration against the global
    /// default, per the three-way dispatch in §4.7: a full config is used
    /// verbatim, an override is merged onto the global correlation config,
    /// and an absent spec reuses the global config verbatim.
    fn resolve_trigger(&self, global: &GlobalConfig) -> Result<AnyTriggerConfig, TriggerError> {
        match &self.trigger {
            ChannelTriggerSpec::Full(cfg) => Ok(cfg.clone()),
            ChannelTriggerSpec::Absent => Ok(global.trigger.clone()),
            ChannelTriggerSpec::Override(over) => match &global.trigger {
                AnyTriggerConfig::Correlation(base) => Ok(AnyTriggerConfig::Correlation(over.apply(base))),
                _ => Err(TriggerError::InvalidTriggerConfig(
                    "channel specifies a correlation-trigger override, but the global trigger is not CorrelationTrigger"
                        .to_string(),
                )),
            },
        }
    }
}

/// Derived per-channel parameters plus the constructed trigger tree. Built
/// once per channel before frame processing begins.
#[derive(Debug)]
pub struct ChannelBinding {
    pub tsamp_trigger: usize,
    pub tsamp_render: usize,
    pub trigger_stride: u32,
    pub render_stride: u32,
    pub trigger: AnyTrigger,
}

impl ChannelBinding {
    pub fn new(channel: &ChannelConfig, global: &GlobalConfig, smp_s: f64) -> Result<Self, TriggerError> {
        let tsub = global.trigger_subsampling;
        let rsub = global.render_subsampling;
        let tw = channel.trigger_width.unwrap_or(global.trigger_width);
        let rw = channel.render_width.unwrap_or(global.render_width);

        let tsamp_trigger = calculate_nsamp(global.trigger_ms, tsub, smp_s);
        let tsamp_render = calculate_nsamp(global.render_ms, rsub, smp_s);

        let trigger_stride = tsub * tw;
        let render_stride = rsub * rw;

        let resolved_trigger_cfg = channel.resolve_trigger(global)?;
        let trigger = resolved_trigger_cfg.build(tsamp_trigger, trigger_stride, global.fps, smp_s)?;

        Ok(Self {
            tsamp_trigger,
            tsamp_render,
            trigger_stride,
            render_stride,
            trigger,
        })
    }
}

fn calculate_nsamp(width_ms: f64, sub: u32, smp_s: f64) -> usize {
    let width_s = width_ms / 1000.0;
    (width_s * smp_s / sub.max(1) as f64).round() as usize
}
