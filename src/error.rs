use thiserror::Error;

/// Errors raised at the engine's call boundary.
///
/// A rejected call never touches the current layout: the grid keeps serving
/// the rows it computed with the last valid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("container width must be positive and finite, got {0}")]
    InvalidContainerWidth(f64),
    #[error("target row height must be positive and finite, got {0}")]
    InvalidRowHeight(f64),
    #[error("gap must be non-negative, finite and narrower than the container, got {0}")]
    InvalidGap(f64),
    #[error("scale must be positive and finite, got {0}")]
    InvalidScale(f64),
    #[error("invalid viewport: offset {scroll_offset}, height {height}")]
    InvalidViewport { scroll_offset: f64, height: f64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("no tokio runtime available to drive page fetches")]
    NoRuntime,
}

pub(crate) fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
