use tracing::warn;

use crate::error::{positive_finite, GridError};
use crate::models::{ImagePlacement, ImageRow, Item};

/// Inputs of the justified layout. Two packs with equal params over equal
/// items produce identical rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackParams {
    pub container_width: f64,
    pub target_row_height: f64,
    pub gap: f64,
}

impl PackParams {
    pub fn new(container_width: f64, target_row_height: f64, gap: f64) -> Result<Self, GridError> {
        if !positive_finite(container_width) {
            return Err(GridError::InvalidContainerWidth(container_width));
        }
        if !positive_finite(target_row_height) {
            return Err(GridError::InvalidRowHeight(target_row_height));
        }
        if !gap.is_finite() || gap < 0.0 || gap >= container_width {
            return Err(GridError::InvalidGap(gap));
        }
        Ok(Self {
            container_width,
            target_row_height,
            gap,
        })
    }
}

#[derive(Debug, Clone)]
struct PendingTile {
    hash: String,
    natural_width: f64,
}

/// Greedy justified row packer that accepts items one at a time.
///
/// # Algorithm
/// 1. Each item gets a natural width at the target row height.
/// 2. Items accumulate in an open row until natural widths plus gaps reach
///    the container width.
/// 3. The row is closed with a uniform scale so it spans the container
///    exactly; its height becomes `target_row_height * scale`.
/// 4. Items still in the open row are laid out unstretched at the target
///    height, left-aligned, until more items close the row.
///
/// Closed rows are never touched again, so feeding more items only appends.
#[derive(Debug, Clone)]
pub struct JustifiedPacker {
    params: PackParams,
    rows: Vec<ImageRow>,
    pending: Vec<PendingTile>,
    pending_width: f64,
    consumed: usize,
    skipped: usize,
}

impl JustifiedPacker {
    pub fn new(params: PackParams) -> Self {
        Self {
            params,
            rows: Vec::new(),
            pending: Vec::new(),
            pending_width: 0.0,
            consumed: 0,
            skipped: 0,
        }
    }

    pub fn params(&self) -> PackParams {
        self.params
    }

    pub fn closed_rows(&self) -> &[ImageRow] {
        &self.rows
    }

    /// Number of items fed so far, skipped ones included.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of items rejected for unusable dimensions.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Feeds one item. Returns true when a row was closed.
    pub fn push(&mut self, item: &Item) -> bool {
        self.consumed += 1;

        let natural_width = item.natural_width(self.params.target_row_height);
        if item.is_degenerate() || !positive_finite(natural_width) {
            self.skipped += 1;
            warn!(
                hash = %item.hash,
                width = item.width,
                height = item.height,
                "Skipping item with unusable dimensions"
            );
            return false;
        }

        let mut closed = false;
        // Gaps alone would fill the container: close what we have first.
        if !self.pending.is_empty()
            && self.params.gap * self.pending.len() as f64 >= self.params.container_width
        {
            self.close_row();
            closed = true;
        }

        self.pending.push(PendingTile {
            hash: item.hash.clone(),
            natural_width,
        });
        self.pending_width += natural_width;

        if self.pending_width + self.pending_gaps() >= self.params.container_width {
            self.close_row();
            closed = true;
        }
        closed
    }

    /// Feeds items in order. Returns the number of rows closed.
    pub fn extend<'a, I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = &'a Item>,
    {
        items.into_iter().filter(|item| self.push(item)).count()
    }

    /// The trailing row that has not reached the container width yet, laid
    /// out at the unscaled target height.
    pub fn open_row(&self) -> Option<ImageRow> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.layout_pending(1.0))
        }
    }

    pub fn open_row_height(&self) -> Option<f64> {
        (!self.pending.is_empty()).then_some(self.params.target_row_height)
    }

    /// Closed rows followed by the open row, if any.
    pub fn into_rows(self) -> Vec<ImageRow> {
        let open = self.open_row();
        let mut rows = self.rows;
        rows.extend(open);
        rows
    }

    fn pending_gaps(&self) -> f64 {
        self.params.gap * self.pending.len().saturating_sub(1) as f64
    }

    fn close_row(&mut self) {
        let available = self.params.container_width - self.pending_gaps();
        let scale = available / self.pending_width;
        let row = self.layout_pending(scale);
        self.rows.push(row);
        self.pending.clear();
        self.pending_width = 0.0;
    }

    fn layout_pending(&self, scale: f64) -> ImageRow {
        let container_width = self.params.container_width;
        let gap_fraction = self.params.gap / container_width;
        let mut x = 0.0;
        let images = self
            .pending
            .iter()
            .map(|tile| {
                let width = tile.natural_width * scale / container_width;
                let placement = ImagePlacement {
                    hash: tile.hash.clone(),
                    x_relative: x,
                    y_relative: 0.0,
                    width,
                    height: 1.0,
                };
                x += width + gap_fraction;
                placement
            })
            .collect();

        ImageRow::new(
            self.rows.len(),
            self.params.target_row_height * scale,
            images,
        )
    }
}

/// Packs a complete item slice into justified rows.
///
/// The last row is left unstretched if the items ran out before it filled
/// the container.
pub fn pack(items: &[Item], params: PackParams) -> Vec<ImageRow> {
    let mut packer = JustifiedPacker::new(params);
    packer.extend(items);
    packer.into_rows()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn make_item(hash: &str, width: f64, height: f64) -> Item {
        Item::new(hash, width, height)
    }

    fn varied_items(count: usize) -> Vec<Item> {
        let ratios = [1.0, 1.5, 0.75, 16.0 / 9.0, 0.5, 2.4, 1.0 / 3.0];
        (0..count)
            .map(|i| make_item(&format!("{i}"), ratios[i % ratios.len()] * 900.0, 900.0))
            .collect()
    }

    fn params(width: f64, height: f64, gap: f64) -> PackParams {
        PackParams::new(width, height, gap).unwrap()
    }

    #[test]
    fn test_empty_items() {
        let rows = pack(&[], params(1920.0, 220.0, 0.0));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_aspect_ratio_scenario() {
        let items = vec![
            make_item("square", 100.0, 100.0),
            make_item("wide", 200.0, 100.0),
            make_item("tall", 50.0, 100.0),
        ];
        let rows = pack(&items, params(300.0, 100.0, 0.0));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 0);
        assert!((rows[0].height - 100.0).abs() < EPSILON);
        let hashes: Vec<&str> = rows[0].images.iter().map(|p| p.hash.as_str()).collect();
        assert_eq!(hashes, vec!["square", "wide"]);
        assert!((rows[0].images[0].width - 1.0 / 3.0).abs() < EPSILON);
        assert!((rows[0].images[1].x_relative - 1.0 / 3.0).abs() < EPSILON);

        assert_eq!(rows[1].index, 1);
        assert_eq!(rows[1].images.len(), 1);
        assert_eq!(rows[1].images[0].hash, "tall");
        assert!((rows[1].height - 100.0).abs() < EPSILON);
        assert!((rows[1].images[0].width - 50.0 / 300.0).abs() < EPSILON);
    }

    #[test]
    fn test_closed_rows_span_container() {
        let width = 1280.0;
        let gap = 6.0;
        let items = varied_items(200);
        let mut packer = JustifiedPacker::new(params(width, 180.0, gap));
        packer.extend(&items);

        assert!(packer.closed_rows().len() > 10);
        for row in packer.closed_rows() {
            let gaps = gap * (row.images.len() - 1) as f64;
            let total = row.filled_fraction() * width + gaps;
            assert!(
                (total - width).abs() < 1e-6,
                "row {} spans {total}, expected {width}",
                row.index
            );
            assert!(row.height > 0.0);
            for image in &row.images {
                assert!(image.x_relative >= 0.0 && image.x_relative < 1.0);
                assert!(image.width > 0.0 && image.width <= 1.0);
                assert_eq!(image.height, 1.0);
            }
        }
    }

    #[test]
    fn test_packing_is_deterministic() {
        let items = varied_items(120);
        let p = params(1013.0, 197.0, 3.0);
        assert_eq!(pack(&items, p), pack(&items, p));
    }

    #[test]
    fn test_append_keeps_closed_rows() {
        let items = varied_items(150);
        let p = params(1600.0, 200.0, 4.0);

        let mut prefix = JustifiedPacker::new(p);
        prefix.extend(&items[..70]);
        let before = prefix.closed_rows().to_vec();

        prefix.extend(&items[70..]);
        let full = pack(&items, p);

        assert!(!before.is_empty());
        assert_eq!(&full[..before.len()], &before[..]);
        assert_eq!(&prefix.closed_rows()[..before.len()], &before[..]);
    }

    #[test]
    fn test_row_indices_contiguous() {
        let rows = pack(&varied_items(90), params(1920.0, 220.0, 0.0));
        for (expected, row) in rows.iter().enumerate() {
            assert_eq!(row.index, expected);
        }
        let total: usize = rows.iter().map(|r| r.images.len()).sum();
        assert_eq!(total, 90);
    }

    #[test]
    fn test_trailing_row_is_unstretched() {
        let items = vec![make_item("a", 1920.0, 1080.0)];
        let rows = pack(&items, params(1920.0, 220.0, 0.0));
        assert_eq!(rows.len(), 1);
        assert!((rows[0].height - 220.0).abs() < EPSILON);
        assert!(rows[0].filled_fraction() < 1.0);
        assert_eq!(rows[0].images[0].x_relative, 0.0);
    }

    #[test]
    fn test_panorama_shrinks_to_fit() {
        let items = vec![make_item("pano", 15000.0, 1000.0)];
        let rows = pack(&items, params(3000.0, 220.0, 0.0));
        assert_eq!(rows.len(), 1);
        assert!((rows[0].images[0].width - 1.0).abs() < EPSILON);
        assert!((rows[0].height - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_items_are_skipped() {
        let items = vec![
            make_item("a", 100.0, 100.0),
            make_item("zero", 0.0, 100.0),
            make_item("nan", f64::NAN, 100.0),
            make_item("b", 200.0, 100.0),
        ];
        let mut packer = JustifiedPacker::new(params(300.0, 100.0, 0.0));
        packer.extend(&items);

        assert_eq!(packer.consumed(), 4);
        assert_eq!(packer.skipped(), 2);
        let rows = packer.into_rows();
        assert_eq!(rows.len(), 1);
        let hashes: Vec<&str> = rows[0].images.iter().map(|p| p.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "b"]);
    }

    #[test]
    fn test_large_gap_closes_row_early() {
        // Three tiny tiles would need 120px of gaps in a 100px container.
        let items = vec![
            make_item("a", 10.0, 100.0),
            make_item("b", 10.0, 100.0),
            make_item("c", 10.0, 100.0),
        ];
        let p = params(100.0, 100.0, 60.0);
        let mut packer = JustifiedPacker::new(p);
        packer.extend(&items);

        let rows = packer.closed_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].images.len(), 2);
        let total = rows[0].filled_fraction() * 100.0 + 60.0;
        assert!((total - 100.0).abs() < 1e-6);
        assert!(rows[0].height > 0.0);
    }

    #[test]
    fn test_params_reject_invalid_values() {
        assert_eq!(
            PackParams::new(0.0, 100.0, 0.0),
            Err(GridError::InvalidContainerWidth(0.0))
        );
        assert_eq!(
            PackParams::new(100.0, -1.0, 0.0),
            Err(GridError::InvalidRowHeight(-1.0))
        );
        assert_eq!(
            PackParams::new(100.0, 100.0, -2.0),
            Err(GridError::InvalidGap(-2.0))
        );
    }
}
