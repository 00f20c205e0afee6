use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use footprint::{Settings, TilePosition};
use std::path::PathBuf;

/// `footprint` - snap survey points to the buildings that contain them.
///
/// Building outlines come from the survey tile API and are cached on disk,
/// so repeated queries over the same area do not hit the network again.
#[derive(Parser, Debug)]
#[command(name = "footprint", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// JSON settings file. Flags and environment variables override it.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Survey x of the tile matrix origin.
    #[arg(long, env = "NGD_TILES_API_BNG_ORIGIN_X", global = true)]
    pub origin_x: Option<f64>,

    /// Survey y of the tile matrix origin.
    #[arg(long, env = "NGD_TILES_API_BNG_ORIGIN_Y", global = true)]
    pub origin_y: Option<f64>,

    /// Survey units per tile cell.
    #[arg(long, env = "NGD_TILES_API_CELL_SIZE", global = true)]
    pub cell_size: Option<f64>,

    /// Base URL of the vector tiles API.
    #[arg(long, env = "TILES_API_URL", global = true)]
    pub tiles_api_url: Option<String>,

    #[arg(long, env = "OS_PROJECT_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Directory of the persistent tile store.
    #[arg(long, env = "DB_PATH", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,

    /// Print pipeline metrics to stderr when done.
    #[arg(long, global = true, default_value_t = false)]
    pub metrics: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Snap points to building centres.
    ///
    /// Reads `{"centre": {"x":..,"y":..}, "points": [{"x":..,"y":..}, ...]}`
    /// and writes the snapped points as a JSON array, one per input point.
    Snap {
        /// Request file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Build the combined tile for a set of positions and write it as a
    /// `BuildingTile` blob.
    Combine {
        /// Tile whose cell space the output uses, as `row/col`.
        #[arg(long, value_parser = parse_position)]
        centre: TilePosition,

        /// Tiles to combine, as `row/col`; the centre is always included.
        #[arg(long = "tile", value_parser = parse_position)]
        tiles: Vec<TilePosition>,

        #[arg(long)]
        output: PathBuf,
    },

    /// Decode a raw vector tile file and list its buildings.
    Inspect {
        path: PathBuf,

        /// Layer to read; defaults to the configured building layer.
        #[arg(long)]
        layer: Option<String>,
    },
}

pub fn parse_position(s: &str) -> Result<TilePosition, String> {
    let (row, col) = s
        .split_once('/')
        .ok_or_else(|| format!("expected row/col, got {s:?}"))?;
    let row = row.trim().parse().map_err(|e| format!("bad row {row:?}: {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("bad col {col:?}: {e}"))?;
    Ok(TilePosition::new(row, col))
}

impl GlobalArgs {
    /// Settings file (or defaults) with flag and environment overrides
    /// applied on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::from_json_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(x) = self.origin_x {
            settings.grid.origin.x = x;
        }
        if let Some(y) = self.origin_y {
            settings.grid.origin.y = y;
        }
        if let Some(cell_size) = self.cell_size {
            settings.grid.cell_size = cell_size;
        }
        if let Some(url) = &self.tiles_api_url {
            settings.source.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            settings.source.api_key = key.clone();
        }
        if let Some(dir) = &self.store_dir {
            settings.store_dir = dir.clone();
        }

        settings.grid.validate().context("invalid grid settings")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("21303/14613"), Ok(TilePosition::new(21303, 14613)));
        assert_eq!(parse_position("-1/ 2"), Ok(TilePosition::new(-1, 2)));
        assert!(parse_position("21303").is_err());
        assert!(parse_position("a/b").is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "footprint",
            "--cell-size",
            "2.5",
            "--store-dir",
            "/tmp/tiles",
            "combine",
            "--centre",
            "10/20",
            "--tile",
            "10/21",
            "--output",
            "out.bin",
        ])
        .unwrap();

        let settings = cli.global.settings().unwrap();
        assert_eq!(settings.grid.cell_size, 2.5);
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/tiles"));

        match cli.command {
            Command::Combine { centre, tiles, .. } => {
                assert_eq!(centre, TilePosition::new(10, 20));
                assert_eq!(tiles, vec![TilePosition::new(10, 21)]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        let cli = Cli::try_parse_from(["footprint", "--cell-size", "0", "snap"]).unwrap();
        assert!(cli.global.settings().is_err());
    }
}
