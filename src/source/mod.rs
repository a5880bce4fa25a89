//! Item sources feeding the grid.
//!
//! This module provides:
//! - `ItemSource` - the paged, asynchronous interface the grid consumes
//! - `VecItemSource` - an in-memory source, also used for synthetic collections
//! - `DirectoryItemSource` - images and videos discovered on disk, identified by content hash
//! - `Pager` - deduplicated, retrying page fetches checked against a generation

pub mod directory;
pub mod memory;
pub mod pager;
mod video;

use std::future::Future;

use anyhow::Result;

use crate::models::Item;

pub use directory::DirectoryItemSource;
pub use memory::{synthetic_items, VecItemSource};
pub use pager::{PageEvent, Pager};

/// Position of the next page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor(u64);

impl Cursor {
    pub const fn start() -> Self {
        Self(0)
    }

    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> u64 {
        self.0
    }
}

/// One page of items. `next` is `None` once the source is exhausted.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub next: Option<Cursor>,
}

/// A paged source of items in display order.
pub trait ItemSource: Send + Sync + 'static {
    fn next_page(&self, cursor: Cursor) -> impl Future<Output = Result<Page>> + Send;
}
