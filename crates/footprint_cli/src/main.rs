mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Command};
use footprint::{
    parse_tile, DiskStore, HttpTileSource, Pipeline, Settings, SurveyPoint, TileCache,
    TilePosition,
};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Deserialize)]
struct SnapRequest {
    centre: SurveyPoint,
    points: Vec<SurveyPoint>,
}

type DiskPipeline = Pipeline<DiskStore, HttpTileSource>;

fn open_pipeline(settings: &Settings) -> Result<DiskPipeline> {
    let store = DiskStore::open(&settings.store_dir)
        .with_context(|| format!("opening tile store {}", settings.store_dir.display()))?;
    let source =
        HttpTileSource::new(settings.source.clone()).context("configuring tile source")?;
    Ok(Pipeline::new(
        settings.grid,
        settings.source.layer.clone(),
        TileCache::new(store),
        source,
    )?)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn snap(pipeline: &mut DiskPipeline, input: Option<PathBuf>) -> Result<()> {
    let raw = read_input(input.as_deref())?;
    let request: SnapRequest =
        serde_json::from_slice(&raw).context("parsing snap request")?;

    let snapped = pipeline.snap_points(&request.points, request.centre)?;

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &snapped)?;
    writeln!(out)?;
    Ok(())
}

fn combine(
    pipeline: &mut DiskPipeline,
    centre: TilePosition,
    tiles: Vec<TilePosition>,
    output: &Path,
) -> Result<()> {
    let mut positions = vec![centre];
    positions.extend(tiles);

    let tile = pipeline.combined_tile(&positions, centre);
    fs::write(output, tile.encode()).with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(shapes = tile.len(), output = %output.display(), "Wrote combined tile");
    Ok(())
}

fn inspect(path: &Path, layer: &str) -> Result<()> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let tile = parse_tile(&raw, layer).context("decoding vector tile")?;

    let mut out = io::stdout().lock();
    for shape in &tile.shapes {
        let centre = shape
            .approx_centre
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into());
        writeln!(out, "{}\t{}\t{}", shape.id, centre, shape)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Results go to stdout, so logs stay on stderr.
    let subscriber = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr);
    if cli.global.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let settings = cli.global.settings()?;
    tracing::debug!(settings = ?settings.grid, store = %settings.store_dir.display(), "Loaded settings");

    let pipeline = match cli.command {
        Command::Inspect { path, layer } => {
            let layer = layer.unwrap_or_else(|| settings.source.layer.clone());
            return inspect(&path, &layer);
        }
        Command::Snap { input } => {
            let mut pipeline = open_pipeline(&settings)?;
            snap(&mut pipeline, input)?;
            pipeline
        }
        Command::Combine {
            centre,
            tiles,
            output,
        } => {
            let mut pipeline = open_pipeline(&settings)?;
            combine(&mut pipeline, centre, tiles, &output)?;
            pipeline
        }
    };

    if cli.global.metrics {
        eprint!("{}", pipeline.metrics().render()?);
    }
    Ok(())
}
