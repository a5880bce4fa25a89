//! Append-only, deduplicated sequence of items in display order.

use std::collections::HashMap;

use tracing::warn;

use crate::models::Item;

/// Outcome of appending a page of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendReport {
    pub accepted: usize,
    /// Hashes dropped because an earlier occurrence already exists.
    pub duplicates: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ItemSequence {
    items: Vec<Item>,
    positions: HashMap<String, usize>,
}

impl ItemSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends items in order, dropping any whose hash is already known.
    pub fn append(&mut self, items: impl IntoIterator<Item = Item>) -> AppendReport {
        let mut report = AppendReport::default();
        for item in items {
            if self.positions.contains_key(&item.hash) {
                warn!(hash = %item.hash, "Dropping duplicate item");
                report.duplicates.push(item.hash);
                continue;
            }
            self.positions.insert(item.hash.clone(), self.items.len());
            self.items.push(item);
            report.accepted += 1;
        }
        report
    }

    /// Removes an item by hash. Positions after it shift down by one.
    pub fn remove(&mut self, hash: &str) -> Option<Item> {
        let index = self.positions.remove(hash)?;
        let removed = self.items.remove(index);
        for item in &self.items[index..] {
            if let Some(position) = self.positions.get_mut(&item.hash) {
                *position -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    pub fn get(&self, hash: &str) -> Option<&Item> {
        self.positions.get(hash).map(|&index| &self.items[index])
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.positions.contains_key(hash)
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
