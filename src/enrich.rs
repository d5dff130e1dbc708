mod geology;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::assemble::rebuild_collection;
use crate::cluster::{cluster_features, ClusterStore};
use crate::config::PipelineConfig;
use crate::error::{EnrichError, FeatureError, SourceError};
use crate::feature::FeatureCollection;
use crate::grid::{CellKey, GeoCellKey};
use crate::proj::Projector;
use crate::sources::{
    CoarseWeatherSource, PointSeriesSource, SoilReadings, THEME_FROST_DEPTH, THEME_WATER_SATURATION,
};
use crate::spatial::SpatialIndex;

/// A feature excluded from geology enrichment, and why.
#[derive(Debug)]
pub struct FeatureSkip {
    pub road: String,
    pub error: FeatureError,
}

/// Aggregate outcome of one enrichment request. Failures are collected here
/// and surfaced once, instead of once per work unit.
#[derive(Debug, Default)]
pub struct EnrichReport {
    /// Occupied grid cells, the unit of external-query batching.
    pub clusters: usize,
    /// Features that entered the cluster stage.
    pub features: usize,
    /// Features without a representative point, emitted unenriched.
    pub unclustered: usize,
    /// Per-feature geology exclusions.
    pub geology_skips: Vec<FeatureSkip>,
    /// Batched sources that failed outright for this request.
    pub source_failures: Vec<String>,
}

/// The enrichment orchestrator: per request it plans the fan-out from a
/// cluster snapshot, issues the batched external queries, and writes results
/// back onto every feature under bounded concurrency.
pub struct Enricher {
    deposits: Arc<SpatialIndex>,
    fjords: Arc<SpatialIndex>,
    series: Arc<dyn PointSeriesSource>,
    weather: Arc<dyn CoarseWeatherSource>,
    projector: Arc<Projector>,
    config: PipelineConfig,
}

impl Enricher {
    pub fn new(
        deposits: Arc<SpatialIndex>,
        fjords: Arc<SpatialIndex>,
        series: Arc<dyn PointSeriesSource>,
        weather: Arc<dyn CoarseWeatherSource>,
        projector: Arc<Projector>,
        config: PipelineConfig,
    ) -> Self {
        Self { deposits, fjords, series, weather, projector, config }
    }

    /// Full pipeline for one request: cluster, enrich in place, reassemble.
    /// The output collection is a complete bijection of the input features,
    /// enriched where possible.
    pub async fn enrich_collection(
        &self,
        mut collection: FeatureCollection,
        date: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<(FeatureCollection, EnrichReport), EnrichError> {
        let features = std::mem::take(&mut collection.features);
        if features.is_empty() {
            return Err(EnrichError::EmptyFeatureSet);
        }

        let store = Arc::new(ClusterStore::new(self.config.shards));
        let grid = self.config.grid();
        let unclustered = cluster_features(features, &grid, &store);
        if !unclustered.is_empty() {
            warn!(count = unclustered.len(), "features without a representative point bypass enrichment");
        }

        let mut report = if store.is_empty() {
            EnrichReport::default()
        } else {
            self.enrich(&store, date, deadline).await?
        };
        report.unclustered = unclustered.len();

        Ok((rebuild_collection(collection, &store, unclustered, date), report))
    }

    /// Enrich every cluster in the store, mutating features in place.
    /// Returns once every issued work unit has completed (join barrier), or
    /// with `Incomplete` if the deadline cut the fan-out short.
    pub async fn enrich(
        &self,
        store: &Arc<ClusterStore>,
        date: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<EnrichReport, EnrichError> {
        let keys = store.snapshot_keys();
        if keys.is_empty() {
            return Err(EnrichError::EmptyFeatureSet);
        }

        let mut report = EnrichReport {
            clusters: keys.len(),
            features: store.len(),
            ..EnrichReport::default()
        };

        // One batched call per theme plus one weather sweep, all in flight
        // together. A failed source leaves its attribute unset everywhere.
        let (frost, water, soil) = tokio::join!(
            self.series.batch_query(&keys, date, THEME_FROST_DEPTH),
            self.series.batch_query(&keys, date, THEME_WATER_SATURATION),
            self.weather_by_cell(&keys, date),
        );
        let values = Arc::new(CellValues {
            frost: values_or_log(frost, THEME_FROST_DEPTH, &mut report),
            water: values_or_log(water, THEME_WATER_SATURATION, &mut report),
            soil: values_or_log(soil, "weather", &mut report),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut join = JoinSet::new();
        let mut issued = 0usize;

        for key in keys {
            if deadline.is_some_and(|at| Instant::now() >= at) {
                break;
            }
            let permit = match deadline {
                Some(at) => match timeout_at(at, semaphore.clone().acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    _ => break,
                },
                None => match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            issued += 1;

            let store = Arc::clone(store);
            let deposits = Arc::clone(&self.deposits);
            let fjords = Arc::clone(&self.fjords);
            let values = Arc::clone(&values);
            let spacing = self.config.sample_spacing;
            join.spawn(async move {
                let _permit = permit;
                enrich_cluster(key, &store, &deposits, &fjords, &values, spacing)
            });
        }

        let total = report.clusters;
        let mut finished = 0usize;
        let drain = async {
            while let Some(joined) = join.join_next().await {
                finished += 1;
                match joined {
                    Ok(outcome) => report.geology_skips.extend(outcome.skips),
                    Err(err) => warn!(%err, "cluster work unit failed"),
                }
            }
        };
        match deadline {
            Some(at) => {
                if timeout_at(at, drain).await.is_err() {
                    join.abort_all();
                    warn!(finished, total, "deadline reached, abandoning in-flight enrichment");
                    return Err(EnrichError::Incomplete { finished, total });
                }
            }
            None => drain.await,
        }
        if issued < total {
            return Err(EnrichError::Incomplete { finished, total });
        }

        info!(
            clusters = report.clusters,
            features = report.features,
            geology_skips = report.geology_skips.len(),
            source_failures = report.source_failures.len(),
            "enrichment finished"
        );
        Ok(report)
    }

    /// Re-cluster cell keys onto the coarse geographic grid, query the
    /// weather source once, and fan the readings back to every member cell.
    async fn weather_by_cell(
        &self,
        keys: &[CellKey],
        date: NaiveDate,
    ) -> Result<HashMap<CellKey, SoilReadings>, SourceError> {
        let grid = self.config.grid();
        let mut coarse: HashMap<GeoCellKey, Vec<CellKey>> = HashMap::new();
        for &key in keys {
            let center = key.center();
            match self.projector.to_lonlat(center.x, center.y) {
                Ok((lon, lat)) => coarse.entry(grid.coarse_key(lon, lat)).or_default().push(key),
                Err(err) => warn!(%err, cell = %key, "failed to reproject cluster center, skipping cell"),
            }
        }

        let coarse_keys: Vec<GeoCellKey> = coarse.keys().copied().collect();
        let readings = self.weather.batch_query(&coarse_keys, date).await?;

        let mut by_cell = HashMap::with_capacity(keys.len());
        for (coarse_key, members) in coarse {
            let Some(&reading) = readings.get(&coarse_key) else {
                debug!(cell = %coarse_key, "no weather reading for coarse cell");
                continue;
            };
            for member in members {
                by_cell.insert(member, reading);
            }
        }
        Ok(by_cell)
    }
}

fn values_or_log<T>(
    result: Result<HashMap<CellKey, T>, SourceError>,
    source: &str,
    report: &mut EnrichReport,
) -> HashMap<CellKey, T> {
    match result {
        Ok(values) => values,
        Err(err) => {
            warn!(source, %err, "batched source query failed, attribute left unset");
            report.source_failures.push(format!("{source}: {err}"));
            HashMap::new()
        }
    }
}

struct ClusterOutcome {
    skips: Vec<FeatureSkip>,
}

/// The demultiplexed batch-query results, keyed by cell.
struct CellValues {
    frost: HashMap<CellKey, f64>,
    water: HashMap<CellKey, f64>,
    soil: HashMap<CellKey, SoilReadings>,
}

/// Enrich one cluster: exactly one work unit touches a given cluster, so no
/// two tasks ever write the same feature.
fn enrich_cluster(
    key: CellKey,
    store: &ClusterStore,
    deposits: &SpatialIndex,
    fjords: &SpatialIndex,
    values: &CellValues,
    spacing: f64,
) -> ClusterOutcome {
    let center = key.center();
    let in_fjord = !fjords.query(center.x, center.y).is_empty();
    let frost_depth = values.frost.get(&key).copied();
    let water_saturation = values.water.get(&key).copied();
    let readings = values.soil.get(&key).copied();

    if frost_depth.is_none() {
        debug!(cell = %key, "no frost value for cell");
    }

    let mut skips = Vec::new();
    let updated = store.with_cluster_mut(&key, |features| {
        for feature in features.iter_mut() {
            if let Some(depth) = frost_depth {
                feature.frost_depth = depth;
                feature.is_frozen = depth > 0.0;
            }
            if let Some(saturation) = water_saturation {
                feature.water_saturation = saturation;
            }
            if let Some(reading) = readings {
                feature.soil_temperature_54cm = reading.temperature_54cm;
                feature.soil_moisture_10_to_40cm = reading.moisture_10_to_40cm;
            }
            feature.cluster_center_in_fjord = in_fjord;

            match geology::deposit_codes(feature, deposits, spacing) {
                Ok(codes) => feature.superficial_deposit_codes = codes,
                Err(error) => skips.push(FeatureSkip {
                    road: feature.properties.road_number.clone(),
                    error,
                }),
            }

            feature.classify();
        }
    });
    if updated.is_none() {
        warn!(cell = %key, "cluster disappeared before enrichment");
    }

    ClusterOutcome { skips }
}
