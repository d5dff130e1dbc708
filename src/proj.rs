use anyhow::{anyhow, Context, Result};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// EPSG:25833 (ETRS89 / UTM zone 33N), the projected CRS road geometries and
/// the primary grid live in.
const UTM33_PROJ4: &str = "+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs +type=crs";

/// WGS84 geographic, the CRS of the coarse weather grid.
const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Projected→geographic point transform, injected into the orchestrator so
/// the re-clustering step stays a pure function of its inputs.
pub struct Projector {
    from: Proj,
    to: Proj,
}

impl Projector {
    /// The pipeline default: EPSG:25833 meters in, WGS84 degrees out.
    pub fn utm33_to_wgs84() -> Result<Self> {
        Ok(Self {
            from: Proj::from_proj_string(UTM33_PROJ4)
                .with_context(|| anyhow!("failed to build source PROJ.4: {UTM33_PROJ4}"))?,
            to: Proj::from_proj_string(WGS84_PROJ4)
                .with_context(|| anyhow!("failed to build target PROJ.4: {WGS84_PROJ4}"))?,
        })
    }

    /// Transform a projected point to (lon, lat) in degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        // Meters in, radians out.
        let mut point = (x, y, 0.0);
        transform(&self.from, &self.to, &mut point)
            .map_err(|err| anyhow!("CRS transform failed for ({x}, {y}): {err}"))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm33_point_lands_in_southern_norway() {
        let projector = Projector::utm33_to_wgs84().unwrap();
        let (lon, lat) = projector.to_lonlat(262_000.0, 6_650_000.0).unwrap();
        assert!((9.0..12.0).contains(&lon), "lon = {lon}");
        assert!((59.0..61.0).contains(&lat), "lat = {lat}");
    }

    #[test]
    fn transform_is_deterministic() {
        let projector = Projector::utm33_to_wgs84().unwrap();
        let a = projector.to_lonlat(262_000.0, 6_650_000.0).unwrap();
        let b = projector.to_lonlat(262_000.0, 6_650_000.0).unwrap();
        assert_eq!(a, b);
    }
}
