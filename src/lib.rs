//! Virtualized justified grid for large media collections.
//!
//! Items arrive in pages from an [`ItemSource`], are packed into rows that
//! span the container exactly, and only the rows near the viewport are handed
//! to the renderer.

pub mod config;
pub mod error;
pub mod grid;
pub mod layout;
pub mod models;
pub mod source;

pub use config::{GridConfig, RetryPolicy};
pub use error::GridError;
pub use grid::{GridFrame, GridStatus, MediaGrid, PackStep, RenderSink};
pub use layout::{pack, JustifiedPacker, PackParams, RowOffsets, ScaleController, VirtualWindow};
pub use models::{ImagePlacement, ImageProps, ImageRow, Item, MediaKind, RenderRow, SelectionStore};
pub use source::{
    synthetic_items, Cursor, DirectoryItemSource, ItemSource, Page, PageEvent, Pager, VecItemSource,
};
