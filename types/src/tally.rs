//! Per-candidate vote counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::CandidateId;

/// Mapping `candidate → count`, ordered by candidate id.
///
/// Serializes as a flat JSON object (`{"c1": 3, "c2": 0}`), the shape the
/// read-model service returns from `GET /votes`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally(BTreeMap<CandidateId, u64>);

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for a candidate; missing candidates report zero.
    pub fn get(&self, id: &CandidateId) -> u64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    pub fn set(&mut self, id: CandidateId, count: u64) {
        self.0.insert(id, count);
    }

    pub fn increment(&mut self, id: CandidateId) {
        *self.0.entry(id).or_insert(0) += 1;
    }

    /// Insert a zero entry for every listed candidate that has none.
    pub fn ensure_listed<'a>(&mut self, ids: impl IntoIterator<Item = &'a CandidateId>) {
        for id in ids {
            self.0.entry(id.clone()).or_insert(0);
        }
    }

    /// Raise each count to at least the count in `floor`.
    pub fn merge_max(&mut self, floor: &Tally) {
        for (id, count) in floor.iter() {
            let entry = self.0.entry(id.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CandidateId, u64)> {
        self.0.iter().map(|(id, c)| (id, *c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CandidateId, u64)> for Tally {
    fn from_iter<I: IntoIterator<Item = (CandidateId, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> CandidateId {
        CandidateId::from_sequence(n)
    }

    #[test]
    fn missing_candidate_counts_zero() {
        assert_eq!(Tally::new().get(&id(7)), 0);
    }

    #[test]
    fn merge_max_only_raises() {
        let mut lagging: Tally = [(id(1), 2), (id(2), 5)].into_iter().collect();
        let ledger: Tally = [(id(1), 3), (id(2), 4), (id(3), 1)].into_iter().collect();
        lagging.merge_max(&ledger);
        assert_eq!(lagging.get(&id(1)), 3);
        assert_eq!(lagging.get(&id(2)), 5);
        assert_eq!(lagging.get(&id(3)), 1);
    }

    #[test]
    fn json_shape_is_flat_object() {
        let mut t = Tally::new();
        t.set(id(2), 1);
        t.set(id(10), 4);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"c2":1,"c10":4}"#);
        let back: Tally = serde_json::from_str(r#"{"c1": 3}"#).unwrap();
        assert_eq!(back.get(&id(1)), 3);
    }

    #[test]
    fn ensure_listed_keeps_existing_counts() {
        let mut t: Tally = [(id(1), 2)].into_iter().collect();
        t.ensure_listed(&[id(1), id(2)]);
        assert_eq!(t.get(&id(1)), 2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.total(), 2);
    }
}
