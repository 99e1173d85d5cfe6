use ballot_types::{Account, CandidateId, SubmissionId};
use serde::{Deserialize, Serialize};

/// A vote submission whose outcome is not yet known.
///
/// Handed back to the caller inside `LedgerError::Unavailable`; retrying
/// with the same value lets the ledger recognise a vote that already landed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVote {
    pub account: Account,
    pub candidate_id: CandidateId,
    pub submission_id: SubmissionId,
}

impl PendingVote {
    /// A fresh submission.
    pub fn new(account: Account, candidate_id: CandidateId) -> Self {
        let submission_id = SubmissionId::generate(&account, &candidate_id);
        Self {
            account,
            candidate_id,
            submission_id,
        }
    }
}
