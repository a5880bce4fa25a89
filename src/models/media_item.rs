#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" => Some(Self::Image),
            "webm" | "mp4" | "mkv" | "avi" | "mov" => Some(Self::Video),
            _ => None,
        }
    }
}

/// A single media entry as reported by an item source.
///
/// `hash` is the content identity used for selection and deduplication;
/// the intrinsic dimensions only matter through their aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub hash: String,
    pub width: f64,
    pub height: f64,
    pub kind: MediaKind,
    pub name: Option<String>,
}

impl Item {
    pub fn new(hash: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            hash: hash.into(),
            width,
            height,
            kind: MediaKind::Image,
            name: None,
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// True when the intrinsic dimensions cannot produce a tile.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Width of the tile when drawn at `row_height` without stretching.
    pub fn natural_width(&self, row_height: f64) -> f64 {
        row_height * self.aspect_ratio()
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("webm"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_natural_width() {
        let item = Item::new("a", 1920.0, 1080.0);
        assert!((item.natural_width(180.0) - 320.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_dimensions() {
        assert!(Item::new("a", 0.0, 100.0).is_degenerate());
        assert!(Item::new("b", 100.0, -1.0).is_degenerate());
        assert!(Item::new("c", f64::NAN, 100.0).is_degenerate());
        assert!(Item::new("d", f64::INFINITY, 100.0).is_degenerate());
        assert!(!Item::new("e", 1.0, 1.0).is_degenerate());
    }
}
