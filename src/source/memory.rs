use std::future::{self, Future};
use std::sync::Arc;

use anyhow::{bail, Result};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use super::{Cursor, ItemSource, Page};
use crate::models::Item;

/// Serves a fixed list of items in pages of `page_size`.
#[derive(Debug, Clone)]
pub struct VecItemSource {
    items: Arc<Vec<Item>>,
    page_size: usize,
}

impl VecItemSource {
    pub fn new(items: Vec<Item>, page_size: usize) -> Self {
        Self {
            items: Arc::new(items),
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn page_at(&self, cursor: Cursor) -> Result<Page> {
        let len = self.items.len();
        let start = cursor.offset() as usize;
        if start > len {
            bail!("cursor {start} is past the end of {len} items");
        }
        let end = (start + self.page_size).min(len);
        Ok(Page {
            items: self.items[start..end].to_vec(),
            next: (end < len).then(|| Cursor::new(end as u64)),
        })
    }
}

impl ItemSource for VecItemSource {
    fn next_page(&self, cursor: Cursor) -> impl Future<Output = Result<Page>> + Send {
        future::ready(self.page_at(cursor))
    }
}

/// Builds `count` items with pseudo-random aspect ratios between 0.4 and 2.4.
///
/// The same seed always yields the same collection.
pub fn synthetic_items(count: usize, seed: u64) -> Vec<Item> {
    (0..count as u64)
        .map(|index| {
            let rank = xxh3_64_with_seed(&index.to_le_bytes(), seed);
            let ratio = 0.4 + (rank % 2001) as f64 / 1000.0;
            let height = 1000.0;
            Item::new(format!("{rank:016x}"), (ratio * height).round(), height)
                .with_name(format!("synthetic-{index:06}"))
        })
        .collect()
}
