use std::time::Duration;

use crate::error::{positive_finite, GridError};

/// Retry behaviour for failed page fetches.
///
/// Backoff doubles after every failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Configuration for a media grid instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Row height in pixels at scale 1.0 (default: 220)
    pub base_row_height: f64,
    /// Gap between tiles and between rows in pixels (default: 0)
    pub gap: f64,
    /// Initial container width in pixels (default: 1200)
    pub container_width: f64,
    /// Initial viewport height in pixels (default: 800)
    pub viewport_height: f64,
    /// Extra pixels above and below the viewport that are still rendered (default: 400)
    pub overscan: f64,
    /// How far below the rendered window rows are packed and pages fetched (default: 1200)
    pub prefetch_distance: f64,
    /// Maximum items packed per event turn while catching up after an invalidation (default: 512)
    pub pack_budget: usize,
    /// Lowest accepted scale multiplier (default: 0.25)
    pub min_scale: f64,
    /// Highest accepted scale multiplier (default: 4.0)
    pub max_scale: f64,
    pub retry: RetryPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_row_height: 220.0,
            gap: 0.0,
            container_width: 1200.0,
            viewport_height: 800.0,
            overscan: 400.0,
            prefetch_distance: 1200.0,
            pack_budget: 512,
            min_scale: 0.25,
            max_scale: 4.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if !positive_finite(self.base_row_height) {
            return Err(GridError::InvalidRowHeight(self.base_row_height));
        }
        if !positive_finite(self.container_width) {
            return Err(GridError::InvalidContainerWidth(self.container_width));
        }
        if !self.gap.is_finite() || self.gap < 0.0 || self.gap >= self.container_width {
            return Err(GridError::InvalidGap(self.gap));
        }
        if !self.viewport_height.is_finite() || self.viewport_height < 0.0 {
            return Err(GridError::InvalidViewport {
                scroll_offset: 0.0,
                height: self.viewport_height,
            });
        }
        if !self.overscan.is_finite() || self.overscan < 0.0 {
            return Err(GridError::InvalidConfig("overscan must be non-negative"));
        }
        if !self.prefetch_distance.is_finite() || self.prefetch_distance < 0.0 {
            return Err(GridError::InvalidConfig("prefetch distance must be non-negative"));
        }
        if self.pack_budget == 0 {
            return Err(GridError::InvalidConfig("pack budget must be at least one item"));
        }
        if !positive_finite(self.min_scale) || !positive_finite(self.max_scale) {
            return Err(GridError::InvalidConfig("scale bounds must be positive"));
        }
        if self.min_scale > self.max_scale {
            return Err(GridError::InvalidConfig("min scale exceeds max scale"));
        }
        if self.retry.max_attempts == 0 {
            return Err(GridError::InvalidConfig("retry policy needs at least one attempt"));
        }
        Ok(())
    }
}
