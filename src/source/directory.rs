//! Item source backed by image and video files in a directory.
//!
//! - File discovery using walkdir, once per source, in path order
//! - Dimensions read from image headers or video container headers
//! - Items identified by an xxh3 hash of the file contents, so copies of the
//!   same file collapse into one item

use std::fs::File;
use std::future::Future;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use tokio::task;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::Xxh3;

use super::video::video_dimensions;
use super::{Cursor, ItemSource, Page};
use crate::models::{Item, MediaKind};

type Listing = Arc<Mutex<Option<Arc<Vec<PathBuf>>>>>;

pub struct DirectoryItemSource {
    root: PathBuf,
    recursive: bool,
    page_size: usize,
    listing: Listing,
}

impl DirectoryItemSource {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            page_size: page_size.max(1),
            listing: Arc::new(Mutex::new(None)),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ItemSource for DirectoryItemSource {
    fn next_page(&self, cursor: Cursor) -> impl Future<Output = Result<Page>> + Send {
        let root = self.root.clone();
        let recursive = self.recursive;
        let page_size = self.page_size;
        let listing = Arc::clone(&self.listing);

        async move {
            task::spawn_blocking(move || read_page(&root, recursive, &listing, cursor, page_size))
                .await
                .context("Directory page task failed")?
        }
    }
}

fn read_page(
    root: &Path,
    recursive: bool,
    listing: &Listing,
    cursor: Cursor,
    page_size: usize,
) -> Result<Page> {
    let files = listing_for(root, recursive, listing)?;
    let start = cursor.offset() as usize;
    if start > files.len() {
        bail!("cursor {start} is past the end of {} files", files.len());
    }
    let end = (start + page_size).min(files.len());

    let mut items = Vec::with_capacity(end - start);
    for path in &files[start..end] {
        match read_item(path) {
            Ok(item) => items.push(item),
            Err(err) => warn!(error = ?err, path = %path.display(), "Skipping unreadable file"),
        }
    }

    debug!(start, end, total = files.len(), read = items.len(), "Read directory page");
    Ok(Page {
        items,
        next: (end < files.len()).then(|| Cursor::new(end as u64)),
    })
}

fn listing_for(root: &Path, recursive: bool, listing: &Listing) -> Result<Arc<Vec<PathBuf>>> {
    let mut guard = listing.lock();
    if let Some(files) = guard.as_ref() {
        return Ok(Arc::clone(files));
    }
    let files = Arc::new(discover_images(root, recursive)?);
    *guard = Some(Arc::clone(&files));
    Ok(files)
}

fn discover_images(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let mut walker = WalkDir::new(root);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if media_kind(path).is_some() {
            files.push(path.to_path_buf());
        } else {
            trace!(path = %path.display(), "Skipping non-media file");
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "Discovered media files");
    Ok(files)
}

fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    MediaKind::from_extension(ext)
}

fn read_item(path: &Path) -> Result<Item> {
    let kind = media_kind(path)
        .with_context(|| format!("Not a media file: {}", path.display()))?;
    let (width, height) = match kind {
        MediaKind::Image => image::image_dimensions(path)
            .with_context(|| format!("Failed to read dimensions of {}", path.display()))?,
        MediaKind::Video => video_dimensions(path)?,
    };

    let mut item = Item::new(
        format!("{:016x}", content_hash(path)?),
        f64::from(width),
        f64::from(height),
    )
    .with_kind(kind);
    if let Some(name) = path.file_name() {
        item = item.with_name(name.to_string_lossy());
    }
    Ok(item)
}

/// xxh3 of the whole file, streamed so large videos are never held in memory.
fn content_hash(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::video::tests::{mp4_header, webm_header};
    use crate::source::video::FALLBACK_DIMENSIONS;
    use image::RgbImage;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_image(path: &Path, width: u32, height: u32) {
        RgbImage::new(width, height).save(path).unwrap();
    }

    #[tokio::test]
    async fn test_pages_through_directory() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("a.png"), 40, 20);
        create_test_image(&dir.path().join("b.png"), 20, 40);
        create_test_image(&dir.path().join("c.png"), 30, 30);
        fs::write(dir.path().join("notes.txt"), b"not media").unwrap();

        let source = DirectoryItemSource::new(dir.path(), 2);
        let first = source.next_page(Cursor::start()).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].name.as_deref(), Some("a.png"));
        assert_eq!((first.items[0].width, first.items[0].height), (40.0, 20.0));
        assert_eq!(first.next, Some(Cursor::new(2)));

        let second = source.next_page(Cursor::new(2)).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name.as_deref(), Some("c.png"));
        assert_eq!(second.next, None);
    }

    #[tokio::test]
    async fn test_identical_files_share_hash() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("one.png"), 10, 10);
        fs::copy(dir.path().join("one.png"), dir.path().join("two.png")).unwrap();

        let source = DirectoryItemSource::new(dir.path(), 10);
        let page = source.next_page(Cursor::start()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].hash, page.items[1].hash);
    }

    #[tokio::test]
    async fn test_unreadable_image_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
        create_test_image(&dir.path().join("ok.png"), 8, 4);

        let source = DirectoryItemSource::new(dir.path(), 10);
        let page = source.next_page(Cursor::start()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name.as_deref(), Some("ok.png"));
    }

    #[tokio::test]
    async fn test_non_recursive_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        create_test_image(&dir.path().join("root.png"), 4, 4);
        create_test_image(&nested.join("deep.png"), 6, 4);

        let recursive = DirectoryItemSource::new(dir.path(), 10);
        let page = recursive.next_page(Cursor::start()).await.unwrap();
        assert_eq!(page.items.len(), 2);

        let flat = DirectoryItemSource::new(dir.path(), 10).recursive(false);
        let page = flat.next_page(Cursor::start()).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let source = DirectoryItemSource::new(dir.path().join("missing"), 10);
        assert!(source.next_page(Cursor::start()).await.is_err());
    }

    #[tokio::test]
    async fn test_videos_become_video_items() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("a.png"), 40, 20);
        fs::write(dir.path().join("b.mp4"), mp4_header(1280, 720)).unwrap();
        fs::write(dir.path().join("c.webm"), webm_header(640, 480)).unwrap();
        fs::write(dir.path().join("d.mkv"), b"truncated upload").unwrap();

        let source = DirectoryItemSource::new(dir.path(), 10);
        let page = source.next_page(Cursor::start()).await.unwrap();
        assert_eq!(page.items.len(), 4);

        assert!(!page.items[0].is_video());
        let videos = &page.items[1..];
        assert!(videos.iter().all(|item| item.kind == MediaKind::Video));
        assert_eq!((videos[0].width, videos[0].height), (1280.0, 720.0));
        assert_eq!((videos[1].width, videos[1].height), (640.0, 480.0));

        let (width, height) = FALLBACK_DIMENSIONS;
        assert_eq!((videos[2].width, videos[2].height), (f64::from(width), f64::from(height)));
        assert!(!videos[2].is_degenerate());
    }
}
