//! Per-(frame, channel) scratch shared across a stacked primary trigger and
//! its post-trigger. Produced fresh by the caller once per frame, passed by
//! mutable reference, and must not be retained past the call.

/// Mutable state threaded through one `get_trigger` call and (if present)
/// its post-trigger. `period` and `mean` must be populated by the primary
/// trigger before the post-trigger runs; `spectrum` is optional.
#[derive(Debug, Clone, Default)]
pub struct TriggerFrameCache {
    /// Estimated signal period, in *non-subsampled* source samples.
    pub period: Option<i64>,
    /// DC offset of the fetched window, in the trigger's own stride domain.
    pub mean: Option<f32>,
    /// Most recent log-frequency-binned spectrum, if pitch-invariance ran.
    pub spectrum: Option<Vec<f32>>,
}

impl TriggerFrameCache {
    pub fn new() -> Self {
        Self::default()
    }
}
