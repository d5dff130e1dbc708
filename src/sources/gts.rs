use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PointSeriesSource;
use crate::error::SourceError;
use crate::grid::CellKey;

/// Default endpoint of the national grid time-series service.
pub const DEFAULT_GTS_URL: &str = "https://gts.nve.no/api/MultiPointTimeSeries/ByMapCoordinateCsv";

#[derive(Debug, Serialize)]
struct MultiPointRequest<'a> {
    #[serde(rename = "Theme")]
    theme: &'a str,
    #[serde(rename = "StartDate")]
    start_date: String,
    #[serde(rename = "EndDate")]
    end_date: String,
    #[serde(rename = "Format")]
    format: &'static str,
    #[serde(rename = "MapCoordinateCsv")]
    map_coordinate_csv: String,
}

#[derive(Debug, Deserialize)]
struct MultiPointResponse {
    #[serde(rename = "CellTimeSeries", default)]
    cell_time_series: Vec<CellTimeSeries>,
    #[serde(rename = "NoDataValue", default)]
    no_data_value: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CellTimeSeries {
    #[serde(rename = "X")]
    x: i64,
    #[serde(rename = "Y")]
    y: i64,
    #[serde(rename = "Data", default)]
    data: Vec<f64>,
}

/// Client for the multi-point grid time-series API. One POST per theme
/// carries every cell center of the request as a coordinate CSV; the
/// response echoes each cell's coordinates, which is what the demultiplexing
/// keys on.
pub struct GridTimeSeriesClient {
    http: Client,
    url: String,
}

impl GridTimeSeriesClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: Client::new(), url: url.into() }
    }

    pub fn default_endpoint() -> Self {
        Self::new(DEFAULT_GTS_URL)
    }
}

#[async_trait]
impl PointSeriesSource for GridTimeSeriesClient {
    async fn batch_query(
        &self,
        cells: &[CellKey],
        date: NaiveDate,
        theme: &str,
    ) -> Result<HashMap<CellKey, f64>, SourceError> {
        // "x1 y1,x2 y2,..." — one pair per occupied cell.
        let mut csv = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                csv.push(',');
            }
            let _ = write!(csv, "{} {}", cell.x(), cell.y());
        }

        // The midday sample of the requested date.
        let window = format!("{}T12", date.format("%Y-%m-%d"));
        let body = MultiPointRequest {
            theme,
            start_date: window.clone(),
            end_date: window,
            format: "json",
            map_coordinate_csv: csv,
        };

        debug!(theme, cells = cells.len(), "querying grid time-series source");
        let response = self.http.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let decoded: MultiPointResponse = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        if decoded.cell_time_series.is_empty() {
            return Err(SourceError::EmptyPayload);
        }

        let no_data = decoded.no_data_value.map(|value| value as f64);
        let mut values = HashMap::with_capacity(decoded.cell_time_series.len());
        for series in decoded.cell_time_series {
            let Some(&value) = series.data.first() else { continue };
            if no_data.is_some_and(|sentinel| value == sentinel) {
                continue;
            }
            values.insert(CellKey::new(series.x, series.y), value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_provider_field_names() {
        let body = MultiPointRequest {
            theme: "gwb_frd",
            start_date: "2021-03-01T12".to_string(),
            end_date: "2021-03-01T12".to_string(),
            format: "json",
            map_coordinate_csv: "261500 6649500,262500 6649500".to_string(),
        };
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["Theme"], "gwb_frd");
        assert_eq!(encoded["StartDate"], "2021-03-01T12");
        assert_eq!(encoded["MapCoordinateCsv"], "261500 6649500,262500 6649500");
    }

    #[test]
    fn response_demultiplexes_by_echoed_cell() {
        let raw = r#"{
            "CellTimeSeries": [
                {"X": 261500, "Y": 6649500, "Altitude": 120, "CellIndex": 1, "Data": [1.5]},
                {"X": 262500, "Y": 6649500, "Altitude": 130, "CellIndex": 2, "Data": [-9999.0]}
            ],
            "Theme": "gwb_frd",
            "NoDataValue": -9999,
            "Unit": "cm"
        }"#;
        let decoded: MultiPointResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.cell_time_series.len(), 2);
        assert_eq!(decoded.no_data_value, Some(-9999));

        let no_data = decoded.no_data_value.map(|value| value as f64);
        let mut values = HashMap::new();
        for series in decoded.cell_time_series {
            let Some(&value) = series.data.first() else { continue };
            if no_data.is_some_and(|sentinel| value == sentinel) {
                continue;
            }
            values.insert(CellKey::new(series.x, series.y), value);
        }
        assert_eq!(values.len(), 1);
        assert_eq!(values[&CellKey::new(261_500, 6_649_500)], 1.5);
    }
}
