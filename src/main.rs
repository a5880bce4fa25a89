mod bench;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mediagrid::{
    synthetic_items, DirectoryItemSource, GridConfig, GridStatus, ItemSource, MediaGrid,
    VecItemSource,
};

#[derive(Parser, Debug)]
#[command(name = "mediagrid")]
#[command(version)]
#[command(about = "Scroll a justified media grid and report frame timings")]
struct Cli {
    /// Directory of images to lay out
    path: Option<PathBuf>,

    /// Lay out N synthetic items instead of a directory
    #[arg(long, value_name = "N", conflicts_with = "path")]
    synthetic: Option<usize>,

    /// Seed for synthetic aspect ratios
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Container width in pixels
    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 800.0)]
    viewport_height: f64,

    /// Row height multiplier
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Gap between tiles and rows in pixels
    #[arg(long, default_value_t = 0.0)]
    gap: f64,

    /// Items per fetched page
    #[arg(long, default_value_t = 200)]
    page_size: usize,

    /// Scroll distance per simulated frame in pixels
    #[arg(long, default_value_t = 120.0)]
    step: f64,

    /// Label tiles with their file names
    #[arg(long)]
    show_names: bool,

    /// Select the first N items on screen before scrolling
    #[arg(long, value_name = "N", default_value_t = 0)]
    select: usize,

    /// Do not descend into subdirectories
    #[arg(long)]
    flat: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mediagrid=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = GridConfig {
        container_width: cli.width,
        viewport_height: cli.viewport_height,
        gap: cli.gap,
        ..Default::default()
    };

    match (&cli.path, cli.synthetic) {
        (Some(path), _) => {
            let source = DirectoryItemSource::new(path, cli.page_size).recursive(!cli.flat);
            run(source, config, &cli).await
        }
        (None, Some(count)) => {
            let source = VecItemSource::new(synthetic_items(count, cli.seed), cli.page_size);
            run(source, config, &cli).await
        }
        (None, None) => bail!("Pass a directory or --synthetic N"),
    }
}

async fn run<S: ItemSource>(source: S, config: GridConfig, cli: &Cli) -> Result<()> {
    let mut grid = MediaGrid::new(source, config).context("Invalid grid configuration")?;
    grid.set_scale(cli.scale).context("Invalid scale")?;
    grid.set_show_names(cli.show_names);
    grid.settle().await;

    let on_screen: Vec<String> = grid
        .frame()
        .rows
        .iter()
        .flat_map(|row| row.images.iter().map(|tile| tile.hash.clone()))
        .take(cli.select)
        .collect();
    for hash in &on_screen {
        grid.add_media(hash);
    }

    info!(
        width = cli.width,
        row_height = grid.target_row_height(),
        selected = on_screen.len(),
        "Starting scroll"
    );
    let report = bench::simulate_scroll(&mut grid, cli.step).await?;
    report.print();

    if let GridStatus::Partial { error } = grid.status() {
        warn!(%error, "Collection only partially loaded");
    }
    Ok(())
}
