use chrono::NaiveDate;

use crate::cluster::ClusterStore;
use crate::feature::{FeatureCollection, RoadFeature};

/// Flatten every cluster, plus any features that never clustered, into one
/// output list. Ordering is unspecified; every input feature appears exactly
/// once.
pub fn assemble(store: &ClusterStore, unclustered: Vec<RoadFeature>) -> Vec<RoadFeature> {
    let mut features = store.drain();
    features.extend(unclustered);
    features
}

/// Rebuild the outer collection around the assembled features, stamping the
/// request date if the upstream left it empty.
pub fn rebuild_collection(
    mut collection: FeatureCollection,
    store: &ClusterStore,
    unclustered: Vec<RoadFeature>,
    date: NaiveDate,
) -> FeatureCollection {
    collection.features = assemble(store, unclustered);
    if collection.date.is_empty() {
        collection.date = date.format("%Y-%m-%d").to_string();
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellKey;

    fn feature_at(x: f64, y: f64) -> RoadFeature {
        let mut feature = RoadFeature::default();
        feature.geometry.coordinates = vec![[x, y]];
        feature
    }

    #[test]
    fn assembly_is_a_bijection_of_the_input() {
        let store = ClusterStore::new(4);
        store.insert(CellKey::new(500, 500), feature_at(100.0, 100.0));
        store.insert(CellKey::new(500, 500), feature_at(200.0, 200.0));
        store.insert(CellKey::new(1500, 500), feature_at(1100.0, 100.0));

        let features = assemble(&store, vec![RoadFeature::default()]);
        assert_eq!(features.len(), 4);
        assert!(store.is_empty());
    }

    #[test]
    fn empty_collection_date_is_restamped() {
        let collection = FeatureCollection {
            kind: "FeatureCollection".to_string(),
            number_matched: 0,
            name: String::new(),
            crs: None,
            date: String::new(),
            features: Vec::new(),
        };
        let store = ClusterStore::new(1);
        store.insert(CellKey::new(500, 500), feature_at(100.0, 100.0));

        let date = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let rebuilt = rebuild_collection(collection, &store, Vec::new(), date);
        assert_eq!(rebuilt.date, "2021-03-01");
        assert_eq!(rebuilt.features.len(), 1);
    }
}
