/// Position and size of one tile, relative to its row's bounding box.
///
/// `x_relative` and `width` are fractions of the container width,
/// `y_relative` and `height` fractions of the row height.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub hash: String,
    pub x_relative: f64,
    pub y_relative: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub index: usize,
    /// Absolute height in pixels.
    pub height: f64,
    pub images: Vec<ImagePlacement>,
}

impl ImageRow {
    pub fn new(index: usize, height: f64, images: Vec<ImagePlacement>) -> Self {
        Self {
            index,
            height,
            images,
        }
    }

    /// Sum of the width fractions of all tiles, gaps excluded.
    pub fn filled_fraction(&self) -> f64 {
        self.images.iter().map(|image| image.width).sum()
    }
}

/// Absolute pixel geometry of one tile, ready for a render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProps {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    /// Distance from the top of the grid content.
    pub offset_y: f64,
    pub hash: String,
    pub is_selected: bool,
    /// Display name, only populated while names are shown.
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
    pub index: usize,
    pub top: f64,
    pub height: f64,
    pub images: Vec<ImageProps>,
}
