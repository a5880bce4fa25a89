//! The media grid engine.
//!
//! `MediaGrid` owns the item sequence, the packed rows, the scroll window, the
//! selection and the scale. Consumers read derived state (frames, selection)
//! and mutate only through the methods here.
//!
//! Packing is lazy: rows are produced until the content reaches
//! `prefetch_distance` below the rendered window, and pages are requested only
//! when every loaded item is packed and the content is still too short.

use std::borrow::Cow;
use std::ops::Range;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::GridConfig;
use crate::error::GridError;
use crate::layout::{JustifiedPacker, PackParams, RowOffsets, ScaleController, VirtualWindow};
use crate::models::{ImageProps, ImageRow, Item, ItemSequence, RenderRow, SelectionStore};
use crate::source::{ItemSource, PageEvent, Pager};

/// Receives rows as they enter and leave the rendered window.
pub trait RenderSink {
    fn show_row(&mut self, row: &RenderRow);
    fn release_row(&mut self, index: usize);
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridStatus {
    /// A page request is in flight.
    Loading,
    /// More items can be fetched on demand.
    Idle,
    /// The source is exhausted; the last row is final.
    Complete,
    /// Fetching failed and paging is frozen. The loaded rows stay usable.
    Partial { error: String },
}

/// Outcome of one budgeted packing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackStep {
    /// The step was scheduled for a layout that has since been invalidated.
    Stale,
    /// More items need packing to cover the window.
    Pending,
    /// The window is covered, or every loaded item is packed.
    Caught,
}

/// Snapshot of what should be on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    pub layout_generation: u64,
    pub total_height: f64,
    pub visible: Range<usize>,
    pub rows: Vec<RenderRow>,
    pub show_names: bool,
    pub selection_mode: bool,
    pub status: GridStatus,
}

#[derive(Debug, Clone)]
struct Rendered {
    generation: u64,
    rows: Range<usize>,
}

pub struct MediaGrid<S: ItemSource> {
    config: GridConfig,
    items: ItemSequence,
    packer: JustifiedPacker,
    offsets: RowOffsets,
    window: VirtualWindow,
    selection: SelectionStore,
    scale: ScaleController,
    pager: Pager<S>,
    show_names: bool,
    layout_generation: u64,
    failure: Option<String>,
    rendered: Rendered,
}

impl<S: ItemSource> MediaGrid<S> {
    /// Creates a grid fetching through the current tokio runtime.
    pub fn new(source: S, config: GridConfig) -> Result<Self, GridError> {
        let runtime = Handle::try_current().map_err(|_| GridError::NoRuntime)?;
        Self::with_runtime(source, config, runtime)
    }

    pub fn with_runtime(source: S, config: GridConfig, runtime: Handle) -> Result<Self, GridError> {
        config.validate()?;
        let scale = ScaleController::new(config.base_row_height, config.min_scale, config.max_scale)?;
        let params = PackParams::new(config.container_width, scale.target_row_height(), config.gap)?;
        let mut window = VirtualWindow::new(config.viewport_height, config.overscan);
        window.set_viewport(0.0, config.viewport_height)?;

        Ok(Self {
            items: ItemSequence::new(),
            packer: JustifiedPacker::new(params),
            offsets: RowOffsets::new(config.gap),
            window,
            selection: SelectionStore::new(),
            scale,
            pager: Pager::new(source, config.retry.clone(), runtime),
            show_names: false,
            layout_generation: 0,
            failure: None,
            rendered: Rendered {
                generation: 0,
                rows: 0..0,
            },
            config,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        self.pager.source()
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn selected_hashes(&self) -> Vec<&str> {
        self.selection.selected_hashes()
    }

    pub fn selection_mode(&self) -> bool {
        self.selection.selection_mode()
    }

    pub fn is_selected(&self, hash: &str) -> bool {
        self.selection.is_selected(hash)
    }

    /// Toggles selection of `hash`. Returns the new membership.
    pub fn add_media(&mut self, hash: &str) -> bool {
        self.selection.toggle(hash)
    }

    pub fn clear_all_media(&mut self) {
        self.selection.clear();
    }

    pub fn show_names(&self) -> bool {
        self.show_names
    }

    pub fn set_show_names(&mut self, show: bool) {
        self.show_names = show;
    }

    pub fn scale(&self) -> f64 {
        self.scale.scale()
    }

    pub fn target_row_height(&self) -> f64 {
        self.scale.target_row_height()
    }

    /// Changes the row-height multiplier and re-packs from the first row.
    ///
    /// Selection and fetch progress are untouched.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), GridError> {
        let previous = self.scale.clone();
        if !self.scale.set_scale(scale)? {
            return Ok(());
        }
        let params = PackParams::new(
            self.container_width(),
            self.scale.target_row_height(),
            self.config.gap,
        );
        match params {
            Ok(params) => {
                self.invalidate_layout(params);
                Ok(())
            }
            Err(err) => {
                self.scale = previous;
                Err(err)
            }
        }
    }

    pub fn container_width(&self) -> f64 {
        self.packer.params().container_width
    }

    pub fn set_container_width(&mut self, width: f64) -> Result<(), GridError> {
        let params = PackParams::new(width, self.scale.target_row_height(), self.config.gap)?;
        if params == self.packer.params() {
            return Ok(());
        }
        self.invalidate_layout(params);
        Ok(())
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub fn set_viewport(&mut self, scroll_offset: f64, viewport_height: f64) -> Result<(), GridError> {
        self.window.set_viewport(scroll_offset, viewport_height)?;
        self.refresh();
        Ok(())
    }

    pub fn scroll_to(&mut self, scroll_offset: f64) -> Result<(), GridError> {
        let height = self.window.viewport_height();
        self.set_viewport(scroll_offset, height)
    }

    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    pub fn items(&self) -> &[Item] {
        self.items.as_slice()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items already fed to the packer, including skipped ones.
    pub fn packed_item_count(&self) -> usize {
        self.packer.consumed()
    }

    /// Rows laid out so far, the open trailing row included.
    pub fn row_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn closed_rows(&self) -> &[ImageRow] {
        self.packer.closed_rows()
    }

    pub fn row(&self, index: usize) -> Option<ImageRow> {
        self.row_ref(index).map(Cow::into_owned)
    }

    pub fn total_height(&self) -> f64 {
        self.offsets.total_height()
    }

    pub fn row_at_offset(&self, y: f64) -> Option<usize> {
        self.offsets.row_at(y)
    }

    pub fn status(&self) -> GridStatus {
        if let Some(error) = &self.failure {
            GridStatus::Partial {
                error: error.clone(),
            }
        } else if self.pager.is_loading() {
            GridStatus::Loading
        } else if self.pager.is_exhausted() {
            GridStatus::Complete
        } else {
            GridStatus::Idle
        }
    }

    pub fn requests_issued(&self) -> u64 {
        self.pager.requests_issued()
    }

    /// Removes an item and re-packs from the first row.
    pub fn remove_media(&mut self, hash: &str) -> bool {
        if self.items.remove(hash).is_none() {
            return false;
        }
        self.invalidate_layout(self.packer.params());
        true
    }

    /// Drops every item and restarts paging from the first page. Responses
    /// to requests made before the reload are discarded.
    pub fn reload(&mut self) {
        info!(items = self.items.len(), "Reloading grid");
        self.pager.reset();
        self.items.clear();
        self.failure = None;
        self.invalidate_layout(self.packer.params());
    }

    /// Resumes paging after the grid went partial.
    pub fn retry_paging(&mut self) -> bool {
        if !self.pager.unfreeze() {
            return false;
        }
        self.failure = None;
        self.refresh();
        true
    }

    /// Applies page responses that already arrived and continues packing.
    ///
    /// Never waits. Returns the number of page events applied.
    pub fn pump(&mut self) -> usize {
        let events = self.pager.poll();
        let count = events.len();
        for event in events {
            self.apply_page_event(event);
        }
        self.refresh();
        count
    }

    /// Waits for in-flight pages and packs until the window is covered, the
    /// source is exhausted, or paging failed.
    pub async fn settle(&mut self) {
        loop {
            self.refresh();
            if let Some(event) = self.pager.wait().await {
                self.apply_page_event(event);
                continue;
            }
            if !self.has_layout_backlog() {
                break;
            }
        }
    }

    /// Packs up to one budget of items for layout `generation`.
    ///
    /// Steps scheduled before an invalidation report `Stale` and do nothing.
    pub fn pack_step(&mut self, generation: u64) -> PackStep {
        if generation != self.layout_generation {
            debug!(generation, current = self.layout_generation, "Dropping stale pack step");
            return PackStep::Stale;
        }
        self.pack_toward_window();
        if self.has_layout_backlog() {
            PackStep::Pending
        } else {
            self.request_if_needed();
            PackStep::Caught
        }
    }

    pub fn frame(&self) -> GridFrame {
        let visible = self.window.visible_rows(&self.offsets);
        let rows = visible.clone().filter_map(|index| self.render_row(index)).collect();
        GridFrame {
            layout_generation: self.layout_generation,
            total_height: self.offsets.total_height(),
            visible,
            rows,
            show_names: self.show_names,
            selection_mode: self.selection.selection_mode(),
            status: self.status(),
        }
    }

    /// Releases rows that left the window (or belong to an older layout) and
    /// shows every visible row. Returns the visible range.
    pub fn render<R: RenderSink>(&mut self, sink: &mut R) -> Range<usize> {
        let visible = self.window.visible_rows(&self.offsets);
        let previous = self.rendered.rows.clone();
        let stale_layout = self.rendered.generation != self.layout_generation;

        for index in previous {
            if stale_layout || !visible.contains(&index) {
                sink.release_row(index);
            }
        }
        for index in visible.clone() {
            if let Some(row) = self.render_row(index) {
                sink.show_row(&row);
            }
        }

        self.rendered = Rendered {
            generation: self.layout_generation,
            rows: visible.clone(),
        };
        visible
    }

    pub fn render_row(&self, index: usize) -> Option<RenderRow> {
        let top = self.offsets.top(index)?;
        let row = self.row_ref(index)?;
        let container_width = self.container_width();

        let images = row
            .images
            .iter()
            .map(|placement| ImageProps {
                width: placement.width * container_width,
                height: placement.height * row.height,
                offset_x: placement.x_relative * container_width,
                offset_y: top + placement.y_relative * row.height,
                hash: placement.hash.clone(),
                is_selected: self.selection.is_selected(&placement.hash),
                label: if self.show_names {
                    self.items.get(&placement.hash).and_then(|item| item.name.clone())
                } else {
                    None
                },
            })
            .collect();

        Some(RenderRow {
            index,
            top,
            height: row.height,
            images,
        })
    }

    fn row_ref(&self, index: usize) -> Option<Cow<'_, ImageRow>> {
        let closed = self.packer.closed_rows();
        if index < closed.len() {
            Some(Cow::Borrowed(&closed[index]))
        } else if index == closed.len() {
            self.packer.open_row().map(Cow::Owned)
        } else {
            None
        }
    }

    fn invalidate_layout(&mut self, params: PackParams) {
        self.layout_generation += 1;
        self.packer = JustifiedPacker::new(params);
        self.offsets.clear();
        debug!(
            generation = self.layout_generation,
            width = params.container_width,
            row_height = params.target_row_height,
            items = self.items.len(),
            "Layout invalidated"
        );
        self.refresh();
    }

    fn refresh(&mut self) {
        self.pack_toward_window();
        self.request_if_needed();
    }

    fn goal_bottom(&self) -> f64 {
        self.window.window_bottom() + self.config.prefetch_distance
    }

    fn has_layout_backlog(&self) -> bool {
        self.packer.consumed() < self.items.len() && self.offsets.total_height() < self.goal_bottom()
    }

    /// Packs at most `pack_budget` items, stopping once the content reaches
    /// the goal below the window.
    fn pack_toward_window(&mut self) {
        let goal = self.goal_bottom();
        let items = self.items.as_slice();
        let mut budget = self.config.pack_budget;

        while budget > 0
            && self.packer.consumed() < items.len()
            && self.offsets.total_height() < goal
        {
            let item = &items[self.packer.consumed()];
            if self.packer.push(item) {
                sync_offsets(&self.packer, &mut self.offsets);
            }
            self.offsets.set_provisional(self.packer.open_row_height());
            budget -= 1;
        }
    }

    fn request_if_needed(&mut self) {
        if self.packer.consumed() < self.items.len() {
            return;
        }
        if !self.window.needs_rows_below(&self.offsets, self.config.prefetch_distance) {
            return;
        }
        self.pager.request_next();
    }

    fn apply_page_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::Items { items, finished } => {
                let caught_up = self.packer.consumed() == self.items.len();
                let report = self.items.append(items);
                if !report.duplicates.is_empty() {
                    warn!(
                        count = report.duplicates.len(),
                        "Dropped duplicate items from page"
                    );
                }

                // Only the new page is packed; a layout still catching up
                // after an invalidation keeps its budget.
                if caught_up {
                    let start = self.packer.consumed();
                    for item in &self.items.as_slice()[start..] {
                        if self.packer.push(item) {
                            sync_offsets(&self.packer, &mut self.offsets);
                        }
                    }
                    self.offsets.set_provisional(self.packer.open_row_height());
                }

                debug!(
                    accepted = report.accepted,
                    items = self.items.len(),
                    rows = self.offsets.len(),
                    "Applied page"
                );
                if finished {
                    info!(
                        items = self.items.len(),
                        rows = self.offsets.len(),
                        skipped = self.packer.skipped(),
                        "Item source exhausted"
                    );
                }
            }
            PageEvent::Failed { error, .. } => {
                self.failure = Some(format!("{error:#}"));
            }
        }
    }
}

fn sync_offsets(packer: &JustifiedPacker, offsets: &mut RowOffsets) {
    for row in &packer.closed_rows()[offsets.closed_len()..] {
        offsets.push(row.height);
    }
}
