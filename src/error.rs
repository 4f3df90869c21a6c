//! Error taxonomy for the trigger subsystem (see design doc §7).
//!
//! Configuration errors are fatal at construction; `InvalidDataLength` and
//! `MissingPeriod` are fatal at frame scope and indicate a caller/config
//! bug, not a recoverable runtime condition. `WaveOutOfRange` is not part of
//! this taxonomy: `WaveSource` is expected to zero-pad out-of-range reads
//! rather than error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid per-channel trigger config: {0}")]
    InvalidTriggerConfig(String),

    #[error("parameter `{name}` = {value} is out of range [{min}, {max}]")]
    ParamOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("post-trigger must have stride == 1, got {stride}")]
    PostTriggerStride { stride: u32 },

    #[error("post-trigger cannot itself specify a nested post-trigger")]
    NestedPostTrigger,

    #[error("buffer update called with data length {got}, expected {expected}")]
    InvalidDataLength { got: usize, expected: usize },

    #[error(
        "post-trigger invoked without cache.period set; stack a CorrelationTrigger before it"
    )]
    MissingPeriod,
}
