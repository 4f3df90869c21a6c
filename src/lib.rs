//! Per-channel trigger subsystem for a waveform oscilloscope video renderer.
//!
//! Given one or more audio channels and a target frame rate, [`trigger`]
//! chooses, for each frame and channel, a sample index at which to center
//! the rendered waveform window so that periodic signals appear visually
//! stationary across consecutive frames. Audio file I/O and video
//! rendering/encoding are host responsibilities; this crate only consumes a
//! [`wave::WaveSource`] and hands back sample indices.

pub mod cache;
pub mod channel;
pub mod circular;
pub mod error;
pub mod math;
pub mod spectrum;
pub mod trigger;
pub mod wave;

pub use cache::TriggerFrameCache;
pub use channel::{ChannelBinding, ChannelConfig, GlobalConfig};
pub use error::TriggerError;
pub use spectrum::{LogFreqSpectrum, SpectrumConfig};
pub use trigger::{AnyTrigger, AnyTriggerConfig, Trigger};
pub use wave::WaveSource;

/// Single-precision real sample type used throughout this crate.
pub type Sample = f32;
