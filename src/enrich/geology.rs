use smallvec::SmallVec;

use crate::error::FeatureError;
use crate::feature::RoadFeature;
use crate::spatial::SpatialIndex;

/// DBF attribute holding the superficial-deposit class code.
const DEPOSIT_CODE_FIELD: &str = "jordart";

/// Sample deposit codes along a road at roughly `spacing` meter intervals:
/// one index query per `max(1, floor(length / spacing))` evenly spaced
/// vertices, de-duplicated in encounter order. The road length comes from
/// the chainage properties, not from geometry arithmetic.
pub(super) fn deposit_codes(
    feature: &RoadFeature,
    index: &SpatialIndex,
    spacing: f64,
) -> Result<Vec<i64>, FeatureError> {
    let start = parse_chainage(feature, &feature.properties.start_chainage)?;
    let end = parse_chainage(feature, &feature.properties.end_chainage)?;
    let length = end - start;
    if length < 0 {
        return Err(FeatureError::NegativeLength {
            road: feature.properties.road_number.clone(),
            start,
            end,
        });
    }

    let coords = &feature.geometry.coordinates;
    if coords.is_empty() {
        return Ok(Vec::new());
    }

    let samples = ((length as f64 / spacing) as usize).max(1).min(coords.len());
    let mut codes: SmallVec<[i64; 4]> = SmallVec::new();
    for i in 0..samples {
        let [x, y] = coords[i * coords.len() / samples];
        let code = deposit_code_at(index, x, y)?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    Ok(codes.into_vec())
}

/// First bbox hit carrying a deposit code wins; exact polygon containment is
/// deliberately not tested.
fn deposit_code_at(index: &SpatialIndex, x: f64, y: f64) -> Result<i64, FeatureError> {
    index
        .query(x, y)
        .iter()
        .find_map(|attrs| attrs.get(DEPOSIT_CODE_FIELD).and_then(|value| value.as_i64()))
        .ok_or(FeatureError::NoCoverage { x, y })
}

fn parse_chainage(feature: &RoadFeature, value: &str) -> Result<i64, FeatureError> {
    value.trim().parse().map_err(|_| FeatureError::Chainage {
        road: feature.properties.road_number.clone(),
        value: value.to_string(),
    })
}
