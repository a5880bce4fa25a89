//! Scroll simulation measuring how long each frame spends in the grid.

use std::time::Instant;

use anyhow::{bail, Result};
use mediagrid::{GridStatus, ItemSource, MediaGrid, RenderRow, RenderSink};

#[derive(Debug, Default)]
struct CountingSink {
    rows_shown: usize,
    rows_released: usize,
    tiles_shown: usize,
    selected_tiles: usize,
    labelled_tiles: usize,
}

impl RenderSink for CountingSink {
    fn show_row(&mut self, row: &RenderRow) {
        self.rows_shown += 1;
        self.tiles_shown += row.images.len();
        self.selected_tiles += row.images.iter().filter(|tile| tile.is_selected).count();
        self.labelled_tiles += row.images.iter().filter(|tile| tile.label.is_some()).count();
    }

    fn release_row(&mut self, _index: usize) {
        self.rows_released += 1;
    }
}

#[derive(Debug)]
pub struct ScrollReport {
    pub items: usize,
    pub rows: usize,
    pub total_height: f64,
    pub frames: usize,
    pub frame_p50_ms: f64,
    pub frame_p95_ms: f64,
    pub frame_avg_ms: f64,
    pub frames_over_16ms: usize,
    pub frames_over_33ms: usize,
    pub rows_shown: usize,
    pub rows_released: usize,
    pub tiles_shown: usize,
    pub selected_tiles: usize,
    pub labelled_tiles: usize,
    pub selected: usize,
    pub status: GridStatus,
}

impl ScrollReport {
    pub fn print(&self) {
        println!(
            "layout items={} rows={} height={:.0}",
            self.items, self.rows, self.total_height
        );
        println!(
            "frames count={} p50_ms={:.3} p95_ms={:.3} avg_ms={:.3} over16={} over33={}",
            self.frames,
            self.frame_p50_ms,
            self.frame_p95_ms,
            self.frame_avg_ms,
            self.frames_over_16ms,
            self.frames_over_33ms
        );
        println!(
            "render rows_shown={} rows_released={} tiles={} selected_tiles={} labelled_tiles={}",
            self.rows_shown,
            self.rows_released,
            self.tiles_shown,
            self.selected_tiles,
            self.labelled_tiles
        );
        println!("selection count={}", self.selected);
        match &self.status {
            GridStatus::Partial { error } => println!("status=partial error={error}"),
            status => println!("status={status:?}"),
        }
    }
}

/// Scrolls from the top to the end of the collection in `step` pixel
/// increments, timing the scroll, pump and render work of every frame.
///
/// Waiting for pages is excluded from the frame time.
pub async fn simulate_scroll<S: ItemSource>(
    grid: &mut MediaGrid<S>,
    step: f64,
) -> Result<ScrollReport> {
    if !step.is_finite() || step <= 0.0 {
        bail!("Scroll step must be positive, got {step}");
    }

    let mut sink = CountingSink::default();
    let mut frame_times_ms = Vec::new();
    let mut offset = 0.0;

    loop {
        let frame_start = Instant::now();
        grid.scroll_to(offset)?;
        grid.pump();
        grid.render(&mut sink);
        frame_times_ms.push(frame_start.elapsed().as_secs_f64() * 1000.0);

        grid.settle().await;

        let max_offset = (grid.total_height() - grid.window().viewport_height()).max(0.0);
        let settled = matches!(
            grid.status(),
            GridStatus::Complete | GridStatus::Partial { .. }
        );
        if offset >= max_offset && settled {
            break;
        }
        offset = (offset + step).min(max_offset);
    }

    Ok(ScrollReport {
        items: grid.item_count(),
        rows: grid.row_count(),
        total_height: grid.total_height(),
        frames: frame_times_ms.len(),
        frame_p50_ms: percentile_ms(&frame_times_ms, 0.50),
        frame_p95_ms: percentile_ms(&frame_times_ms, 0.95),
        frame_avg_ms: average(&frame_times_ms),
        frames_over_16ms: frame_times_ms.iter().filter(|t| **t > 16.67).count(),
        frames_over_33ms: frame_times_ms.iter().filter(|t| **t > 33.33).count(),
        rows_shown: sink.rows_shown,
        rows_released: sink.rows_released,
        tiles_shown: sink.tiles_shown,
        selected_tiles: sink.selected_tiles,
        labelled_tiles: sink.labelled_tiles,
        selected: grid.selected_hashes().len(),
        status: grid.status(),
    })
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentile_ms(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let clamped = p.clamp(0.0, 1.0);
    let idx = ((sorted.len() - 1) as f64 * clamped).round() as usize;
    sorted[idx]
}
