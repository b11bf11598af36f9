//! In-memory registry of features: the single source of truth for what exists.

use std::collections::HashMap;

use shared::{Feature, FeatureId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureStore {
    features: HashMap<FeatureId, Feature>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a feature, returning the previous record under that id
    pub fn insert(&mut self, feature: Feature) -> Option<Feature> {
        self.features.insert(feature.id.clone(), feature)
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Feature> {
        self.features.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.features.contains_key(id)
    }

    /// Move a feature to a new id. The record's own `id` field follows.
    pub fn rekey(&mut self, old: &str, new: &str) -> bool {
        match self.features.remove(old) {
            Some(mut feature) => {
                feature.id = new.to_string();
                self.features.insert(feature.id.clone(), feature);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Ids in sorted order
    pub fn ids(&self) -> Vec<FeatureId> {
        let mut ids: Vec<FeatureId> = self.features.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_insert_replaces_by_id() {
        let mut store = FeatureStore::new();
        let mut f = fixtures::building("a", fixtures::triangle_ring(), 10.0);
        assert!(store.insert(f.clone()).is_none());
        f.height = 20.0;
        let previous = store.insert(f).unwrap();
        assert_eq!(previous.height, 10.0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().height, 20.0);
    }

    #[test]
    fn test_rekey_moves_record() {
        let mut store = FeatureStore::new();
        store.insert(fixtures::building("tmp", fixtures::triangle_ring(), 10.0));
        assert!(store.rekey("tmp", "perm"));
        assert!(!store.contains("tmp"));
        assert_eq!(store.get("perm").unwrap().id, "perm");
        assert!(!store.rekey("missing", "x"));
    }

    #[test]
    fn test_ids_are_sorted() {
        let mut store = FeatureStore::new();
        store.insert(fixtures::road("b", fixtures::short_line()));
        store.insert(fixtures::road("a", fixtures::short_line()));
        assert_eq!(store.ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
