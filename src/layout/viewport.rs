//! Scroll window over packed rows.
//!
//! Row extents are prefix sums of row heights, so finding the rows that
//! intersect a window is two binary searches regardless of collection size.

use std::ops::Range;

use crate::error::GridError;

/// Vertical extents of packed rows.
///
/// Closed rows are appended as they are packed. The open trailing row is
/// tracked separately since its height is replaced whenever it changes.
#[derive(Debug, Clone, Default)]
pub struct RowOffsets {
    tops: Vec<f64>,
    bottoms: Vec<f64>,
    gap: f64,
    provisional: Option<f64>,
}

impl RowOffsets {
    pub fn new(gap: f64) -> Self {
        Self {
            gap,
            ..Default::default()
        }
    }

    pub fn push(&mut self, height: f64) {
        let top = self.next_top();
        self.tops.push(top);
        self.bottoms.push(top + height);
    }

    pub fn set_provisional(&mut self, height: Option<f64>) {
        self.provisional = height;
    }

    pub fn clear(&mut self) {
        self.tops.clear();
        self.bottoms.clear();
        self.provisional = None;
    }

    pub fn closed_len(&self) -> usize {
        self.tops.len()
    }

    pub fn len(&self) -> usize {
        self.closed_len() + usize::from(self.provisional.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn top(&self, index: usize) -> Option<f64> {
        if index < self.closed_len() {
            Some(self.tops[index])
        } else if index == self.closed_len() && self.provisional.is_some() {
            Some(self.next_top())
        } else {
            None
        }
    }

    pub fn height(&self, index: usize) -> Option<f64> {
        if index < self.closed_len() {
            Some(self.bottoms[index] - self.tops[index])
        } else if index == self.closed_len() {
            self.provisional
        } else {
            None
        }
    }

    pub fn total_height(&self) -> f64 {
        match self.provisional {
            Some(height) => self.next_top() + height,
            None => self.bottoms.last().copied().unwrap_or(0.0),
        }
    }

    /// Index of the row covering `y`, or the next row when `y` falls in a gap.
    pub fn row_at(&self, y: f64) -> Option<usize> {
        let index = self.first_ending_after(y);
        (index < self.len()).then_some(index)
    }

    /// Rows whose extent intersects `[from, to)`.
    pub fn range_intersecting(&self, from: f64, to: f64) -> Range<usize> {
        let first = self.first_ending_after(from);
        let end = self.count_starting_before(to);
        first..end.max(first)
    }

    fn next_top(&self) -> f64 {
        self.bottoms.last().map_or(0.0, |bottom| bottom + self.gap)
    }

    fn first_ending_after(&self, y: f64) -> usize {
        let index = self.bottoms.partition_point(|&bottom| bottom <= y);
        if index < self.closed_len() {
            return index;
        }
        match self.provisional {
            Some(_) if self.total_height() <= y => self.len(),
            _ => index,
        }
    }

    fn count_starting_before(&self, y: f64) -> usize {
        let index = self.tops.partition_point(|&top| top < y);
        if index == self.closed_len() && self.provisional.is_some() && self.next_top() < y {
            index + 1
        } else {
            index
        }
    }
}

/// Scroll position and viewport size, plus the overscan margin rendered
/// around the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualWindow {
    scroll_offset: f64,
    viewport_height: f64,
    overscan: f64,
}

impl VirtualWindow {
    pub fn new(viewport_height: f64, overscan: f64) -> Self {
        Self {
            scroll_offset: 0.0,
            viewport_height: viewport_height.max(0.0),
            overscan: overscan.max(0.0),
        }
    }

    pub fn set_viewport(&mut self, scroll_offset: f64, viewport_height: f64) -> Result<(), GridError> {
        if !scroll_offset.is_finite()
            || !viewport_height.is_finite()
            || scroll_offset < 0.0
            || viewport_height < 0.0
        {
            return Err(GridError::InvalidViewport {
                scroll_offset,
                height: viewport_height,
            });
        }
        self.scroll_offset = scroll_offset;
        self.viewport_height = viewport_height;
        Ok(())
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn window_top(&self) -> f64 {
        (self.scroll_offset - self.overscan).max(0.0)
    }

    pub fn window_bottom(&self) -> f64 {
        self.scroll_offset + self.viewport_height + self.overscan
    }

    /// Rows to materialize: the viewport plus overscan on both sides.
    pub fn visible_rows(&self, offsets: &RowOffsets) -> Range<usize> {
        offsets.range_intersecting(self.window_top(), self.window_bottom())
    }

    /// True when packed content ends less than `prefetch_distance` below the
    /// window.
    pub fn needs_rows_below(&self, offsets: &RowOffsets, prefetch_distance: f64) -> bool {
        offsets.total_height() < self.window_bottom() + prefetch_distance
    }
}
