mod gts;
mod meteo;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SourceError;
use crate::grid::{CellKey, GeoCellKey};

pub use gts::{GridTimeSeriesClient, DEFAULT_GTS_URL};
pub use meteo::EnsembleWeatherClient;

/// Theme identifiers understood by the grid time-series provider.
pub const THEME_FROST_DEPTH: &str = "gwb_frd";
pub const THEME_WATER_SATURATION: &str = "gwb_sssdev";

/// Midday soil readings for one coarse weather cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SoilReadings {
    pub temperature_54cm: f64,
    pub moisture_10_to_40cm: f64,
}

/// An external provider answering one dated value per grid-cell center, for
/// a named theme. The multi-point form is the batching lever: one call
/// serves every occupied cell of a request.
#[async_trait]
pub trait PointSeriesSource: Send + Sync {
    /// Query every cell in one round trip. The result is keyed by the echoed
    /// cell coordinates; cells the provider has no data for are absent.
    async fn batch_query(
        &self,
        cells: &[CellKey],
        date: NaiveDate,
        theme: &str,
    ) -> Result<HashMap<CellKey, f64>, SourceError>;

    /// Single-point convenience for callers without a batch to amortize.
    async fn query(&self, cell: CellKey, date: NaiveDate, theme: &str) -> Result<Option<f64>, SourceError> {
        Ok(self.batch_query(&[cell], date, theme).await?.remove(&cell))
    }
}

/// A provider on a coarser, geographic grid than the primary one. Queried
/// once per occupied coarse cell; results fan back through the coarse→fine
/// cluster mapping.
#[async_trait]
pub trait CoarseWeatherSource: Send + Sync {
    async fn batch_query(
        &self,
        cells: &[GeoCellKey],
        date: NaiveDate,
    ) -> Result<HashMap<GeoCellKey, SoilReadings>, SourceError>;
}
