//! Candidate identity and registration record.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::TypeError;

/// Unique candidate identifier, e.g. `c1`, `c2`.
///
/// Ids issued by a ledger backend are `c{sequence}`; ids received from
/// callers may be arbitrary strings and simply fail validation if unknown.
/// Ordering is numeric on the sequence when both sides carry one, so `c2`
/// sorts before `c10`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    /// Prefix used for backend-assigned ids.
    pub const PREFIX: &'static str = "c";

    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(TypeError::EmptyCandidateId);
        }
        Ok(Self(s))
    }

    /// Build the id for the `n`th registered candidate (1-based).
    pub fn from_sequence(n: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, n))
    }

    /// The registration sequence encoded in this id, if it has the `c{n}` form.
    pub fn sequence(&self) -> Option<u64> {
        let digits = self.0.strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || digits.starts_with('0') {
            return None;
        }
        digits.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for CandidateId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.sequence(), other.sequence()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for CandidateId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered candidate. Immutable once created; never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_round_trip() {
        let id = CandidateId::from_sequence(12);
        assert_eq!(id.as_str(), "c12");
        assert_eq!(id.sequence(), Some(12));
    }

    #[test]
    fn non_sequence_ids_have_no_sequence() {
        assert_eq!(CandidateId::new("alice").unwrap().sequence(), None);
        assert_eq!(CandidateId::new("c").unwrap().sequence(), None);
        assert_eq!(CandidateId::new("c01").unwrap().sequence(), None);
    }

    #[test]
    fn numeric_ordering() {
        let mut ids = vec![
            CandidateId::from_sequence(10),
            CandidateId::new("zeta").unwrap(),
            CandidateId::from_sequence(2),
        ];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(raw, vec!["c2", "c10", "zeta"]);
    }

    #[test]
    fn empty_id_rejected() {
        assert_eq!(CandidateId::new(""), Err(TypeError::EmptyCandidateId));
    }
}
