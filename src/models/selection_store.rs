use std::collections::HashSet;

/// Set of selected item hashes.
///
/// `selection_mode` is recomputed on every mutation so readers never observe
/// a stale flag. Selection is independent of layout: a hash stays selected
/// while its row is not materialized.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selected: HashSet<String>,
    selection_mode: bool,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `hash` if absent, removes it otherwise. Returns the new membership.
    pub fn toggle(&mut self, hash: &str) -> bool {
        let now_selected = if self.selected.remove(hash) {
            false
        } else {
            self.selected.insert(hash.to_owned());
            true
        };
        self.recompute();
        now_selected
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.recompute();
    }

    pub fn is_selected(&self, hash: &str) -> bool {
        self.selected.contains(hash)
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Selected hashes in lexical order.
    pub fn selected_hashes(&self) -> Vec<&str> {
        let mut hashes: Vec<&str> = self.selected.iter().map(String::as_str).collect();
        hashes.sort_unstable();
        hashes
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    fn recompute(&mut self) {
        self.selection_mode = !self.selected.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_set() {
        let mut store = SelectionStore::new();
        store.toggle("keep");
        let before = store.selected_hashes().join(",");

        assert!(store.toggle("h"));
        assert!(!store.toggle("h"));

        assert_eq!(store.selected_hashes().join(","), before);
        assert!(store.is_selected("keep"));
        assert!(!store.is_selected("h"));
    }

    #[test]
    fn test_toggle_then_clear() {
        let mut store = SelectionStore::new();
        store.toggle("a");
        store.toggle("b");
        assert!(store.selection_mode());
        assert_eq!(store.selected_hashes(), vec!["a", "b"]);

        store.clear();
        assert!(store.selected_hashes().is_empty());
        assert!(!store.selection_mode());
    }

    #[test]
    fn test_selection_mode_tracks_size() {
        let mut store = SelectionStore::new();
        let ops = ["a", "b", "a", "c", "b", "c"];
        for hash in ops {
            store.toggle(hash);
            assert_eq!(store.selection_mode(), store.len() > 0);
        }
        assert!(store.is_empty());
        assert!(!store.selection_mode());
    }
}
