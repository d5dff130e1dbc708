use serde::{Deserialize, Serialize};

/// A WFS-style feature collection of forest roads, as delivered by the
/// upstream road source and returned (enriched) to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "numberMatched", default)]
    pub number_matched: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
    #[serde(default)]
    pub date: String,
    pub features: Vec<RoadFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: CrsProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

/// One forest-road segment: a polyline in the projected CRS plus road
/// properties and the enrichment outputs written by the orchestrator.
///
/// Enrichment fields default to zero/empty on input; a field that could not
/// be enriched (failed source, missing cell) keeps its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadFeature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "frostDepth", default)]
    pub frost_depth: f64,
    #[serde(rename = "waterSaturation", default)]
    pub water_saturation: f64,
    #[serde(rename = "soilTemperature54cm", default)]
    pub soil_temperature_54cm: f64,
    #[serde(rename = "soilMoisture10To40cm", default)]
    pub soil_moisture_10_to_40cm: f64,
    #[serde(rename = "superficialDepositCodes", default)]
    pub superficial_deposit_codes: Vec<i64>,
    #[serde(rename = "isFrozen", default)]
    pub is_frozen: bool,
    #[serde(rename = "clusterCenterInFjord", default)]
    pub cluster_center_in_fjord: bool,
    #[serde(default)]
    pub properties: RoadProperties,
    pub geometry: LineGeometry,
}

/// Road properties as named in the upstream WFS payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadProperties {
    #[serde(rename = "kommunenummer", default)]
    pub municipality: String,
    #[serde(rename = "vegkategori", default)]
    pub road_category: String,
    #[serde(rename = "vegfase", default)]
    pub road_phase: String,
    #[serde(rename = "vegnummer", default)]
    pub road_number: String,
    #[serde(rename = "strekningnummer", default)]
    pub section: String,
    #[serde(rename = "delstrekningnummer", default)]
    pub subsection: String,
    /// Chainage (meter value along the road) where the segment starts.
    #[serde(rename = "frameter", default)]
    pub start_chainage: String,
    /// Chainage where the segment ends.
    #[serde(rename = "tilmeter", default)]
    pub end_chainage: String,
    /// Trafficability classification color (RGB).
    #[serde(rename = "farge", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

impl Default for LineGeometry {
    fn default() -> Self {
        Self { kind: "LineString".to_string(), coordinates: Vec::new() }
    }
}

impl Default for RoadFeature {
    fn default() -> Self {
        Self {
            kind: "Feature".to_string(),
            frost_depth: 0.0,
            water_saturation: 0.0,
            soil_temperature_54cm: 0.0,
            soil_moisture_10_to_40cm: 0.0,
            superficial_deposit_codes: Vec::new(),
            is_frozen: false,
            cluster_center_in_fjord: false,
            properties: RoadProperties::default(),
            geometry: LineGeometry::default(),
        }
    }
}

impl RoadFeature {
    /// The single coordinate standing in for the whole segment when
    /// clustering: the vertex at the middle of the coordinate sequence.
    /// `None` for a geometry with no vertices.
    pub fn representative_point(&self) -> Option<[f64; 2]> {
        let coords = &self.geometry.coordinates;
        coords.get(coords.len() / 2).copied()
    }

    /// Derive the trafficability color from the frozen state: blue when the
    /// ground is frozen, red otherwise.
    pub fn classify(&mut self) {
        self.properties.color = Some(if self.is_frozen { [0, 0, 255] } else { [255, 0, 0] });
    }
}
