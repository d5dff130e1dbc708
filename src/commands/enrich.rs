use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::info;

use crate::cli::{Cli, EnrichArgs};
use crate::config::{DatasetConfig, PipelineConfig};
use crate::enrich::Enricher;
use crate::error::parse_request_date;
use crate::feature::FeatureCollection;
use crate::proj::Projector;
use crate::sources::{EnsembleWeatherClient, GridTimeSeriesClient};
use crate::spatial::SpatialIndex;

pub async fn run(cli: &Cli, args: &EnrichArgs) -> Result<()> {
    let date = parse_request_date(&args.time)?;

    let config = PipelineConfig::default();
    let datasets = DatasetConfig::from_data_dir(&args.data_dir);

    // Indexes are built once per process, then shared read-only.
    let deposits = Arc::new(SpatialIndex::build(&datasets.deposit_shapefiles));
    let fjords = Arc::new(SpatialIndex::build(&datasets.fjord_shapefiles));
    info!(deposits = deposits.len(), fjords = fjords.len(), "spatial indexes ready");

    let enricher = Enricher::new(
        deposits,
        fjords,
        Arc::new(GridTimeSeriesClient::default_endpoint()),
        Arc::new(EnsembleWeatherClient::default_endpoints(config.coarse_cells_per_degree)),
        Arc::new(Projector::utm33_to_wgs84()?),
        config,
    );

    let raw = if args.input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read feature collection from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read feature collection: {}", args.input.display()))?
    };
    let collection: FeatureCollection =
        serde_json::from_str(&raw).context("failed to decode feature collection")?;

    let deadline = args.deadline.map(|secs| Instant::now() + Duration::from_secs(secs));
    let (enriched, report) = enricher.enrich_collection(collection, date, deadline).await?;

    if cli.verbose > 0 {
        for skip in &report.geology_skips {
            eprintln!("[skip] road {}: {}", skip.road, skip.error);
        }
        for failure in &report.source_failures {
            eprintln!("[source] {failure}");
        }
    }

    let encoded = serde_json::to_string(&enriched).context("failed to encode enriched collection")?;
    match &args.output {
        Some(path) => std::fs::write(path, encoded)
            .with_context(|| format!("failed to write output: {}", path.display()))?,
        None => println!("{encoded}"),
    }

    Ok(())
}
