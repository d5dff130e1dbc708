#![doc = "Skogsveg public API"]
mod assemble;
mod cluster;
mod config;
mod enrich;
mod error;
mod feature;
mod grid;
mod proj;
mod sources;
mod spatial;

pub mod cli;
pub mod commands;

#[doc(inline)]
pub use assemble::{assemble, rebuild_collection};

#[doc(inline)]
pub use cluster::{cluster_features, ClusterStore};

#[doc(inline)]
pub use config::{DatasetConfig, PipelineConfig};

#[doc(inline)]
pub use enrich::{Enricher, EnrichReport, FeatureSkip};

#[doc(inline)]
pub use error::{parse_request_date, EnrichError, FeatureError, SourceError};

#[doc(inline)]
pub use feature::{FeatureCollection, LineGeometry, RoadFeature, RoadProperties};

#[doc(inline)]
pub use grid::{CellKey, GeoCellKey, GridSpec};

#[doc(inline)]
pub use proj::Projector;

#[doc(inline)]
pub use sources::{
    CoarseWeatherSource, EnsembleWeatherClient, GridTimeSeriesClient, PointSeriesSource,
    SoilReadings, THEME_FROST_DEPTH, THEME_WATER_SATURATION,
};

#[doc(inline)]
pub use spatial::{AttrMap, AttrValue, SpatialIndex};
