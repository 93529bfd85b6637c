//! Maps feature names to dense integer indices, either by hashing (fixed,
//! lossy, no growth) or by interning (exact, growable until frozen).

use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64;

/// A closed two-variant feature map, mirroring the two concrete strategies
/// the input format needs: a fixed-size hashed space for large or unbounded
/// vocabularies, and an exact growable index for small, interpretable runs.
#[derive(Debug, Clone)]
pub enum FeatureMap {
    Hashing(HashingFeatMap),
    Interning(InterningFeatMap),
}

impl FeatureMap {
    pub fn hashing(bits: u32) -> Self {
        FeatureMap::Hashing(HashingFeatMap::new(bits))
    }

    pub fn interning() -> Self {
        FeatureMap::Interning(InterningFeatMap::new())
    }

    /// Looks up (and, in interning mode, creates) the index for `name`.
    /// Returns `None` only for interning mode once frozen and the name is
    /// unseen — the spec's ABSENT case.
    pub fn get_or_insert(&mut self, name: &[u8]) -> Option<u32> {
        match self {
            FeatureMap::Hashing(h) => Some(h.index(name)),
            FeatureMap::Interning(i) => i.get_or_insert(name),
        }
    }

    /// Read-only lookup; never grows the map. Used for audit/inspection.
    pub fn get(&self, name: &[u8]) -> Option<u32> {
        match self {
            FeatureMap::Hashing(h) => Some(h.index(name)),
            FeatureMap::Interning(i) => i.get(name),
        }
    }

    pub fn freeze(&mut self) {
        if let FeatureMap::Interning(i) = self {
            i.freeze();
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            FeatureMap::Hashing(_) => true,
            FeatureMap::Interning(i) => i.frozen,
        }
    }

    /// Total addressable feature space, i.e. the column count a
    /// `WeightVector`'s emission matrix needs.
    pub fn n_feats(&self) -> usize {
        match self {
            FeatureMap::Hashing(h) => 1usize << h.bits,
            FeatureMap::Interning(i) => i.names.len(),
        }
    }
}

/// Hashes feature names into a fixed `2^bits`-wide space with `xxh3_64`.
/// Never grows, never returns ABSENT, collisions are tolerated by design
/// (the hashing trick).
#[derive(Debug, Clone)]
pub struct HashingFeatMap {
    bits: u32,
    mask: u64,
}

impl HashingFeatMap {
    pub fn new(bits: u32) -> Self {
        assert!(bits > 0 && bits <= 32, "hash-bits must be in 1..=32");
        HashingFeatMap {
            bits,
            mask: (1u64 << bits) - 1,
        }
    }

    pub fn index(&self, name: &[u8]) -> u32 {
        (xxh3_64(name) & self.mask) as u32
    }
}

/// Exact, growable feature map backed by a `HashMap<Vec<u8>, u32>` plus a
/// reverse `Vec<Vec<u8>>` for inspection and persistence. Growth stops once
/// `freeze()` has been called, matching the original's "freeze before
/// reading the test set" convention.
#[derive(Debug, Clone, Default)]
pub struct InterningFeatMap {
    pub(crate) feat2index: HashMap<Vec<u8>, u32>,
    pub(crate) names: Vec<Vec<u8>>,
    frozen: bool,
}

impl InterningFeatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &[u8]) -> Option<u32> {
        self.feat2index.get(name).copied()
    }

    pub fn get_or_insert(&mut self, name: &[u8]) -> Option<u32> {
        if let Some(&idx) = self.feat2index.get(name) {
            return Some(idx);
        }
        if self.frozen {
            return None;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_vec());
        self.feat2index.insert(name.to_vec(), idx);
        Some(idx)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn name_of(&self, index: u32) -> Option<&[u8]> {
        self.names.get(index as usize).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_map_is_stable_and_frozen_from_the_start() {
        let map = HashingFeatMap::new(4);
        let a = map.index(b"1^foo");
        let b = map.index(b"1^foo");
        assert_eq!(a, b);
        assert!(a < 16);
    }

    #[test]
    fn hashing_tolerates_collisions_at_low_bit_width() {
        let map = HashingFeatMap::new(2);
        for i in 0..50 {
            let idx = map.index(format!("feat-{i}").as_bytes());
            assert!(idx < 4);
        }
    }

    #[test]
    fn interning_map_grows_then_stops_on_freeze() {
        let mut map = InterningFeatMap::new();
        let a = map.get_or_insert(b"x").unwrap();
        let b = map.get_or_insert(b"y").unwrap();
        assert_ne!(a, b);

        map.freeze();
        assert_eq!(map.get_or_insert(b"x"), Some(a));
        assert_eq!(map.get_or_insert(b"never-seen"), None);
    }

    #[test]
    fn frozen_feature_map_returns_absent_for_unseen_names() {
        let mut map = FeatureMap::interning();
        map.get_or_insert(b"seen");
        map.freeze();
        assert_eq!(map.get_or_insert(b"unseen"), None);
        assert!(map.get_or_insert(b"seen").is_some());
    }
}
