use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CoarseWeatherSource, SoilReadings};
use crate::error::SourceError;
use crate::grid::GeoCellKey;

const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const HOURLY_FIELDS: &str = "soil_temperature_54cm,soil_moisture_10_to_40cm";

#[derive(Debug, Deserialize)]
struct LocationForecast {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    hourly: HourlySeries,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    soil_temperature_54cm: Vec<f64>,
    #[serde(default)]
    soil_moisture_10_to_40cm: Vec<f64>,
}

/// Client for the ensemble weather API. The provider works on its own
/// coarse geographic grid, so it is queried once per occupied coarse cell;
/// past dates go to the historical archive endpoint, today and forecasts to
/// the forecast endpoint.
pub struct EnsembleWeatherClient {
    http: Client,
    forecast_url: String,
    archive_url: String,
    cells_per_degree: i32,
}

impl EnsembleWeatherClient {
    pub fn new(
        forecast_url: impl Into<String>,
        archive_url: impl Into<String>,
        cells_per_degree: i32,
    ) -> Self {
        Self {
            http: Client::new(),
            forecast_url: forecast_url.into(),
            archive_url: archive_url.into(),
            cells_per_degree,
        }
    }

    pub fn default_endpoints(cells_per_degree: i32) -> Self {
        Self::new(DEFAULT_FORECAST_URL, DEFAULT_ARCHIVE_URL, cells_per_degree)
    }
}

/// The midday sample of an hourly series.
fn midday(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        None
    } else {
        Some(series[series.len() / 2])
    }
}

fn join_coords(values: impl Iterator<Item = f64>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

#[async_trait]
impl CoarseWeatherSource for EnsembleWeatherClient {
    async fn batch_query(
        &self,
        cells: &[GeoCellKey],
        date: NaiveDate,
    ) -> Result<HashMap<GeoCellKey, SoilReadings>, SourceError> {
        if cells.is_empty() {
            return Ok(HashMap::new());
        }

        let latitudes = join_coords(cells.iter().map(|cell| cell.lat(self.cells_per_degree)));
        let longitudes = join_coords(cells.iter().map(|cell| cell.lon(self.cells_per_degree)));
        let date_param = date.format("%Y-%m-%d").to_string();

        let url = if date < Local::now().date_naive() {
            &self.archive_url
        } else {
            &self.forecast_url
        };

        debug!(cells = cells.len(), url, "querying weather source");
        let response = self
            .http
            .get(url)
            .query(&[
                ("latitude", latitudes.as_str()),
                ("longitude", longitudes.as_str()),
                ("hourly", HOURLY_FIELDS),
                ("start_date", date_param.as_str()),
                ("end_date", date_param.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let locations: Vec<LocationForecast> = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        if locations.is_empty() {
            return Err(SourceError::EmptyPayload);
        }

        let mut readings = HashMap::with_capacity(locations.len());
        for location in locations {
            // The provider echoes grid-snapped coordinates that rarely equal
            // the requested ones; re-quantize onto our coarse cells so the
            // rejoin is by coordinate key.
            let key = GeoCellKey::quantize(location.longitude, location.latitude, self.cells_per_degree);
            let Some(temperature) = midday(&location.hourly.soil_temperature_54cm) else { continue };
            let Some(moisture) = midday(&location.hourly.soil_moisture_10_to_40cm) else { continue };
            readings.insert(key, SoilReadings { temperature_54cm: temperature, moisture_10_to_40cm: moisture });
        }
        Ok(readings)
    }
}
