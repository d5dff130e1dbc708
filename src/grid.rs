use std::fmt;

use geo::Coord;

/// Key of a primary grid cell: the canonical cell-center coordinates in
/// meters. With the default 1000 m cells every key ends in `...500` on both
/// axes, matching the centers of the national frost-model grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    x: i64,
    y: i64,
}

impl CellKey {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline] pub fn x(&self) -> i64 { self.x }

    #[inline] pub fn y(&self) -> i64 { self.y }

    /// Cell center as a projected-CRS coordinate.
    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord { x: self.x as f64, y: self.y as f64 }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Key of a coarse geographic cell used by the weather grid, quantized to a
/// fixed number of cells per degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoCellKey {
    lon_q: i32,
    lat_q: i32,
}

impl GeoCellKey {
    /// Snap a lon/lat pair onto the coarse grid.
    pub fn quantize(lon: f64, lat: f64, cells_per_degree: i32) -> Self {
        let per = f64::from(cells_per_degree);
        Self {
            lon_q: (lon * per).round() as i32,
            lat_q: (lat * per).round() as i32,
        }
    }

    pub fn lon(&self, cells_per_degree: i32) -> f64 {
        f64::from(self.lon_q) / f64::from(cells_per_degree)
    }

    pub fn lat(&self, cells_per_degree: i32) -> f64 {
        f64::from(self.lat_q) / f64::from(cells_per_degree)
    }
}

impl fmt::Display for GeoCellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon_q, self.lat_q)
    }
}

/// Deterministic grid-key assignment. A pure function of the point and the
/// configured cell sizes only: the same point always yields the same key,
/// independent of call order or concurrency.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    cell_size: f64,
    coarse_cells_per_degree: i32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { cell_size: 1000.0, coarse_cells_per_degree: 4 }
    }
}

impl GridSpec {
    pub fn new(cell_size: f64, coarse_cells_per_degree: i32) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        debug_assert!(coarse_cells_per_degree > 0, "coarse cell count must be positive");
        Self { cell_size, coarse_cells_per_degree }
    }

    #[inline] pub fn cell_size(&self) -> f64 { self.cell_size }

    #[inline] pub fn coarse_cells_per_degree(&self) -> i32 { self.coarse_cells_per_degree }

    /// Map a projected point to its cell key: round each axis to the nearest
    /// cell-size multiple and offset by half a cell, so any two points in the
    /// same cell share a key. This is what bounds external-call volume to one
    /// query per occupied cell rather than one per feature.
    pub fn cell_key(&self, point: Coord<f64>) -> CellKey {
        let half = self.cell_size / 2.0;
        let x = (point.x / self.cell_size).round() * self.cell_size + half;
        let y = (point.y / self.cell_size).round() * self.cell_size + half;
        CellKey::new(x as i64, y as i64)
    }

    /// Snap a geographic coordinate onto the secondary weather grid.
    pub fn coarse_key(&self, lon: f64, lat: f64) -> GeoCellKey {
        GeoCellKey::quantize(lon, lat, self.coarse_cells_per_degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_deterministic() {
        let grid = GridSpec::default();
        let point = Coord { x: 261_222.1, y: 6_649_533.4 };
        assert_eq!(grid.cell_key(point), grid.cell_key(point));
    }

    #[test]
    fn points_in_same_cell_share_a_key() {
        let grid = GridSpec::default();
        let a = grid.cell_key(Coord { x: 1_250_000.0, y: 8_534_700.0 });
        let b = grid.cell_key(Coord { x: 1_249_800.0, y: 8_535_100.0 });
        assert_eq!(a, b);
    }

    #[test]
    fn adjacent_cell_yields_a_different_key() {
        let grid = GridSpec::default();
        let a = grid.cell_key(Coord { x: 1_250_000.0, y: 8_534_700.0 });
        let c = grid.cell_key(Coord { x: 1_251_200.0, y: 8_534_700.0 });
        assert_ne!(a, c);
    }

    #[test]
    fn keys_are_canonical_cell_centers() {
        let grid = GridSpec::default();
        let key = grid.cell_key(Coord { x: 261_222.1, y: 6_649_533.4 });
        assert_eq!(key.x() % 1000, 500);
        assert_eq!(key.y().rem_euclid(1000), 500);
    }

    #[test]
    fn coarse_quantization_round_trips() {
        let key = GeoCellKey::quantize(10.37, 60.12, 4);
        assert_eq!(key.lon(4), 10.25);
        assert_eq!(key.lat(4), 60.0);

        // Same cell regardless of sub-cell position.
        assert_eq!(GeoCellKey::quantize(10.30, 60.05, 4), key);
    }
}
