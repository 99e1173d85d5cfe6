use ballot_ledger::LedgerError;
use ballot_read_model::ReadModelError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TallyError {
    /// Read model failed and the ledger fallback failed too.
    #[error(transparent)]
    ReadModel(#[from] ReadModelError),

    /// No read model is configured and the ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
