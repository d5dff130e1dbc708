use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use geo::{Coord, Rect};
use rstar::{RTree, RTreeObject, AABB};
use shapefile::{Polygon, PolygonRing, Reader, Shape};
use tracing::{error, info, warn};

use super::attrs::{record_to_attrs, AttrMap};

/// A bounding box in the R-tree, sharing its source record's attribute
/// payload. Multi-part geometries contribute one entry per part.
#[derive(Debug, Clone)]
struct IndexedBox {
    bbox: Rect<f64>,
    attrs: Arc<AttrMap>,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Immutable bounding-box index over polygon/line datasets. Built once, then
/// queried concurrently without locking.
///
/// Queries are bbox containment only: a hit means the point is inside a
/// record's bounding box, which over-approximates containment for non-convex
/// or multi-part geometries. Callers consume the hits as-is.
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
}

impl SpatialIndex {
    /// Bulk-load every dataset into one index. Datasets are disjoint, so they
    /// load concurrently. An unreadable dataset is logged and skipped; the
    /// index proceeds with whatever coverage the remaining datasets give.
    pub fn build(paths: &[PathBuf]) -> Self {
        let mut entries = Vec::new();

        thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| (path, scope.spawn(move || load_dataset(path))))
                .collect();

            for (path, handle) in handles {
                match handle.join() {
                    Ok(Ok(loaded)) => entries.extend(loaded),
                    Ok(Err(err)) => {
                        error!(path = %path.display(), %err, "failed to load dataset, continuing with partial index");
                    }
                    Err(_) => {
                        error!(path = %path.display(), "dataset loader panicked, continuing with partial index");
                    }
                }
            }
        });

        info!(datasets = paths.len(), entries = entries.len(), "spatial index built");
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Build from in-memory (bbox, attributes) pairs.
    pub fn from_entries(entries: Vec<(Rect<f64>, AttrMap)>) -> Self {
        let boxes = entries
            .into_iter()
            .map(|(bbox, attrs)| IndexedBox { bbox, attrs: Arc::new(attrs) })
            .collect();
        Self { tree: RTree::bulk_load(boxes) }
    }

    /// Attribute payloads of every record whose bounding box contains the
    /// point. Non-finite coordinates yield an empty result.
    pub fn query(&self, x: f64, y: f64) -> Vec<Arc<AttrMap>> {
        if !x.is_finite() || !y.is_finite() {
            return Vec::new();
        }
        let probe = AABB::from_corners([x, y], [x, y]);
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .map(|entry| Arc::clone(&entry.attrs))
            .collect()
    }

    #[inline] pub fn len(&self) -> usize { self.tree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.tree.size() == 0 }
}

/// Read one shapefile into index entries: bbox per geometry part, attribute
/// payload shared across parts of the same record.
fn load_dataset(path: &Path) -> Result<Vec<IndexedBox>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("failed to open shapefile: {}", path.display()))?;

    let mut entries = Vec::with_capacity(reader.shape_count()?);
    let mut records = 0usize;
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("error reading shape+record")?;
        records += 1;
        let attrs = Arc::new(record_to_attrs(record));

        match shape {
            Shape::Polygon(polygon) => {
                for bbox in polygon_part_bboxes(&polygon) {
                    entries.push(IndexedBox { bbox, attrs: Arc::clone(&attrs) });
                }
            }
            Shape::Polyline(line) => {
                for part in line.parts() {
                    if let Some(bbox) = points_bbox(part) {
                        entries.push(IndexedBox { bbox, attrs: Arc::clone(&attrs) });
                    }
                }
            }
            other => {
                warn!(path = %path.display(), kind = shape_kind(&other), "unsupported geometry type, skipping record");
            }
        }
    }

    info!(path = %path.display(), records, entries = entries.len(), "indexed dataset");
    Ok(entries)
}

/// One bbox per outer ring. Holes never extend a part's bounds, so they are
/// irrelevant here.
fn polygon_part_bboxes(polygon: &Polygon) -> Vec<Rect<f64>> {
    polygon
        .rings()
        .iter()
        .filter_map(|ring| match ring {
            PolygonRing::Outer(points) => points_bbox(points),
            PolygonRing::Inner(_) => None,
        })
        .collect()
}

fn points_bbox(points: &[shapefile::Point]) -> Option<Rect<f64>> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }))
}

fn shape_kind(shape: &Shape) -> &'static str {
    match shape {
        Shape::NullShape => "null",
        Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => "point",
        Shape::Multipoint(_) | Shape::MultipointM(_) | Shape::MultipointZ(_) => "multipoint",
        Shape::Polyline(_) | Shape::PolylineM(_) | Shape::PolylineZ(_) => "polyline",
        Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => "polygon",
        _ => "other",
    }
}
