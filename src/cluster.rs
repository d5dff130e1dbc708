use std::collections::HashMap;
use std::hash::BuildHasher;
use std::thread;

use ahash::RandomState;
use geo::Coord;
use parking_lot::Mutex;

use crate::feature::RoadFeature;
use crate::grid::{CellKey, GridSpec};

/// Seed for the shard hash. Fixed so shard placement is reproducible across
/// runs; placement only needs to be internally consistent, not secret.
const SHARD_HASH_SEED: usize = 0x736b_6f67;

/// Concurrent multimap from cell keys to the features clustered under them.
///
/// The key space is partitioned into independently locked shards, chosen by a
/// stable hash of the key, so concurrent inserters contend on O(1/N) of a
/// single global lock. Snapshots are copy-out: shard locks never escape.
pub struct ClusterStore {
    shards: Vec<Mutex<HashMap<CellKey, Vec<RoadFeature>>>>,
    hasher: RandomState,
}

impl ClusterStore {
    /// Create a store with the given shard count (clamped to at least one).
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::with_seed(SHARD_HASH_SEED),
        }
    }

    #[inline]
    fn shard_for(&self, key: &CellKey) -> usize {
        (self.hasher.hash_one(key) % self.shards.len() as u64) as usize
    }

    /// Append a feature under its cell key. Safe under arbitrary concurrent
    /// callers with the same or different keys.
    pub fn insert(&self, key: CellKey, feature: RoadFeature) {
        self.shards[self.shard_for(&key)]
            .lock()
            .entry(key)
            .or_default()
            .push(feature);
    }

    /// Total number of features across all clusters.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().values().map(Vec::len).sum::<usize>()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// All keys currently present; the unit of the enrichment fan-out.
    pub fn snapshot_keys(&self) -> Vec<CellKey> {
        let mut keys = Vec::new();
        for shard in &self.shards {
            keys.extend(shard.lock().keys().copied());
        }
        keys
    }

    /// Copy-out view of every cluster. Consistent per shard, not atomic as a
    /// whole.
    pub fn snapshot(&self) -> HashMap<CellKey, Vec<RoadFeature>> {
        let mut out = HashMap::new();
        for shard in &self.shards {
            for (key, features) in shard.lock().iter() {
                out.insert(*key, features.clone());
            }
        }
        out
    }

    /// Run `f` on one cluster's feature list under its shard lock. Exactly
    /// one caller at a time can mutate a given cluster; the lock never leaks
    /// out of the closure. Returns `None` if the key is absent.
    pub fn with_cluster_mut<R>(&self, key: &CellKey, f: impl FnOnce(&mut Vec<RoadFeature>) -> R) -> Option<R> {
        let mut shard = self.shards[self.shard_for(key)].lock();
        shard.get_mut(key).map(f)
    }

    /// Remove and return every feature across all shards.
    pub fn drain(&self) -> Vec<RoadFeature> {
        let mut out = Vec::new();
        for shard in &self.shards {
            for (_, mut features) in shard.lock().drain() {
                out.append(&mut features);
            }
        }
        out
    }
}

/// Cluster a batch of features into the store in parallel, keyed by each
/// feature's representative point. Returns the features that have no
/// representative point (empty geometry) so the caller can still emit them.
pub fn cluster_features(features: Vec<RoadFeature>, grid: &GridSpec, store: &ClusterStore) -> Vec<RoadFeature> {
    if features.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(features.len());
    let chunk_size = features.len().div_ceil(workers);
    let unclustered = Mutex::new(Vec::new());

    thread::scope(|scope| {
        let mut rest = features;
        while !rest.is_empty() {
            let take = chunk_size.min(rest.len());
            let chunk: Vec<RoadFeature> = rest.drain(..take).collect();
            let unclustered = &unclustered;
            scope.spawn(move || {
                for feature in chunk {
                    match feature.representative_point() {
                        Some([x, y]) => store.insert(grid.cell_key(Coord { x, y }), feature),
                        None => unclustered.lock().push(feature),
                    }
                }
            });
        }
    });

    unclustered.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_at(x: f64, y: f64) -> RoadFeature {
        let mut feature = RoadFeature::default();
        feature.geometry.coordinates = vec![[x, y]];
        feature
    }

    #[test]
    fn inserts_append_under_the_same_key() {
        let store = ClusterStore::new(4);
        let key = CellKey::new(500, 500);
        store.insert(key, feature_at(100.0, 100.0));
        store.insert(key, feature_at(200.0, 200.0));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&key].len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_keys_cover_every_occupied_cell() {
        let store = ClusterStore::new(4);
        store.insert(CellKey::new(500, 500), feature_at(100.0, 100.0));
        store.insert(CellKey::new(1500, 500), feature_at(1100.0, 100.0));

        let mut keys = store.snapshot_keys();
        keys.sort();
        assert_eq!(keys, vec![CellKey::new(500, 500), CellKey::new(1500, 500)]);
    }

    #[test]
    fn clustering_preserves_every_feature() {
        let grid = GridSpec::default();
        let store = ClusterStore::new(8);
        let features: Vec<RoadFeature> = (0..1000)
            .map(|i| feature_at((i % 37) as f64 * 400.0, (i % 11) as f64 * 900.0))
            .collect();

        let unclustered = cluster_features(features, &grid, &store);
        assert!(unclustered.is_empty());
        assert_eq!(store.len(), 1000);

        let total: usize = store.snapshot().values().map(Vec::len).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn empty_geometry_features_are_returned_unclustered() {
        let grid = GridSpec::default();
        let store = ClusterStore::new(2);
        let features = vec![RoadFeature::default(), feature_at(100.0, 100.0)];

        let unclustered = cluster_features(features, &grid, &store);
        assert_eq!(unclustered.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn with_cluster_mut_targets_one_cluster() {
        let store = ClusterStore::new(4);
        let key = CellKey::new(500, 500);
        store.insert(key, feature_at(100.0, 100.0));

        let updated = store.with_cluster_mut(&key, |features| {
            for feature in features.iter_mut() {
                feature.frost_depth = 1.5;
            }
            true
        });
        assert_eq!(updated, Some(true));
        assert!(store.with_cluster_mut(&CellKey::new(9500, 9500), |_| ()).is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot[&key][0].frost_depth, 1.5);
    }

    #[test]
    fn drain_empties_the_store() {
        let store = ClusterStore::new(4);
        store.insert(CellKey::new(500, 500), feature_at(100.0, 100.0));
        store.insert(CellKey::new(1500, 500), feature_at(1100.0, 100.0));

        let drained = store.drain();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
    }
}
