use tracing::debug;

use crate::error::{positive_finite, GridError};

/// Holds the row-height multiplier.
///
/// Every accepted change bumps `generation`; the grid compares generations to
/// know its packed rows are out of date.
#[derive(Debug, Clone)]
pub struct ScaleController {
    base_row_height: f64,
    scale: f64,
    min_scale: f64,
    max_scale: f64,
    generation: u64,
}

impl ScaleController {
    pub fn new(base_row_height: f64, min_scale: f64, max_scale: f64) -> Result<Self, GridError> {
        if !positive_finite(base_row_height) {
            return Err(GridError::InvalidRowHeight(base_row_height));
        }
        if !positive_finite(min_scale) || !positive_finite(max_scale) || min_scale > max_scale {
            return Err(GridError::InvalidConfig("scale bounds must be positive and ordered"));
        }
        Ok(Self {
            base_row_height,
            scale: 1.0_f64.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
            generation: 0,
        })
    }

    /// Sets the multiplier, clamped to the configured bounds.
    ///
    /// Returns whether the target row height changed.
    pub fn set_scale(&mut self, scale: f64) -> Result<bool, GridError> {
        if !positive_finite(scale) {
            return Err(GridError::InvalidScale(scale));
        }
        let clamped = scale.clamp(self.min_scale, self.max_scale);
        if clamped == self.scale {
            return Ok(false);
        }
        debug!(from = self.scale, to = clamped, "Scale changed");
        self.scale = clamped;
        self.generation += 1;
        Ok(true)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn target_row_height(&self) -> f64 {
        self.base_row_height * self.scale
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_height_follows_scale() {
        let mut scale = ScaleController::new(200.0, 0.25, 4.0).unwrap();
        assert_eq!(scale.target_row_height(), 200.0);

        assert!(scale.set_scale(1.5).unwrap());
        assert_eq!(scale.target_row_height(), 300.0);
        assert_eq!(scale.generation(), 1);
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let mut scale = ScaleController::new(200.0, 0.25, 4.0).unwrap();
        assert!(!scale.set_scale(1.0).unwrap());
        assert_eq!(scale.generation(), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut scale = ScaleController::new(100.0, 0.5, 2.0).unwrap();
        scale.set_scale(10.0).unwrap();
        assert_eq!(scale.scale(), 2.0);
        assert!(!scale.set_scale(3.0).unwrap());
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        let mut scale = ScaleController::new(100.0, 0.5, 2.0).unwrap();
        assert_eq!(scale.set_scale(0.0), Err(GridError::InvalidScale(0.0)));
        assert!(scale.set_scale(f64::NAN).is_err());
        assert_eq!(scale.scale(), 1.0);
        assert_eq!(scale.generation(), 0);
    }
}
