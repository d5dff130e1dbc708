use std::path::{Path, PathBuf};
use std::thread;

use tracing::warn;

use crate::grid::GridSpec;

/// Tunables for the enrichment pipeline. Defaults match the national frost
/// grid (1000 m cells), the weather grid (quarter-degree cells), a 50 m
/// geology sampling interval, and the machine's available parallelism.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Primary grid cell size in meters.
    pub cell_size: f64,
    /// Coarse geographic cells per degree for the weather grid.
    pub coarse_cells_per_degree: i32,
    /// Real-world spacing between geology sample points along a road, meters.
    pub sample_spacing: f64,
    /// Number of cluster-store shards.
    pub shards: usize,
    /// Maximum concurrently in-flight per-cluster work units.
    pub max_in_flight: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let parallelism = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            cell_size: 1000.0,
            coarse_cells_per_degree: 4,
            sample_spacing: 50.0,
            shards: parallelism,
            max_in_flight: parallelism,
        }
    }
}

impl PipelineConfig {
    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.cell_size, self.coarse_cells_per_degree)
    }
}

/// The shapefile datasets the spatial indexes are built from, once per
/// process lifetime.
#[derive(Debug, Clone, Default)]
pub struct DatasetConfig {
    pub deposit_shapefiles: Vec<PathBuf>,
    pub fjord_shapefiles: Vec<PathBuf>,
}

impl DatasetConfig {
    /// Conventional layout under a data directory: `Losmasse/*.shp` holds the
    /// superficial-deposit polygons, `Fjord/*.shp` the fjord catalogue areas.
    /// A missing subdirectory degrades to an empty dataset list; some
    /// coverage is better than none.
    pub fn from_data_dir(dir: &Path) -> Self {
        Self {
            deposit_shapefiles: shapefiles_in(&dir.join("Losmasse")),
            fjord_shapefiles: shapefiles_in(&dir.join("Fjord")),
        }
    }
}

fn shapefiles_in(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "dataset directory unavailable");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp")))
        .collect();
    paths.sort();
    paths
}
