//! Nullable read-model service.

use async_trait::async_trait;
use ballot_read_model::{ReadModel, ReadModelError};
use ballot_store::LedgerReads;
use ballot_types::Tally;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{CallCounter, NullLedger};

#[derive(Clone)]
enum Source {
    Fixed(Arc<Mutex<Tally>>),
    Mirror(NullLedger),
}

/// Read model that either serves a programmable tally or mirrors a
/// [`NullLedger`]. A mirror can be frozen to simulate propagation lag.
#[derive(Clone)]
pub struct NullReadModel {
    source: Source,
    frozen: Arc<Mutex<Option<Tally>>>,
    failing: Arc<AtomicBool>,
    fetches: CallCounter,
}

impl NullReadModel {
    /// Serve `tally` until told otherwise.
    pub fn fixed(tally: Tally) -> Self {
        Self::with_source(Source::Fixed(Arc::new(Mutex::new(tally))))
    }

    /// Serve whatever the ledger currently holds.
    pub fn mirroring(ledger: NullLedger) -> Self {
        Self::with_source(Source::Mirror(ledger))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            frozen: Arc::new(Mutex::new(None)),
            failing: Arc::new(AtomicBool::new(false)),
            fetches: CallCounter::new(),
        }
    }

    /// Replace the served tally (fixed sources only).
    pub fn set(&self, tally: Tally) {
        if let Source::Fixed(current) = &self.source {
            *current.lock().unwrap_or_else(|e| e.into_inner()) = tally;
        }
    }

    /// Keep serving `tally` regardless of the source, simulating lag.
    pub fn freeze(&self, tally: Tally) {
        *self.frozen.lock().unwrap_or_else(|e| e.into_inner()) = Some(tally);
    }

    pub fn unfreeze(&self) {
        *self.frozen.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Answer every fetch with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait]
impl ReadModel for NullReadModel {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn fetch_votes(&self) -> Result<Tally, ReadModelError> {
        self.fetches.hit();
        // Yield so concurrent callers genuinely overlap in tests.
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReadModelError::Status {
                status: 503,
                message: "null read model offline".into(),
            });
        }
        let frozen = self
            .frozen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(tally) = frozen {
            return Ok(tally);
        }
        match &self.source {
            Source::Fixed(tally) => Ok(tally.lock().unwrap_or_else(|e| e.into_inner()).clone()),
            Source::Mirror(ledger) => ledger
                .tally()
                .await
                .map_err(|e| ReadModelError::Unreachable(e.to_string())),
        }
    }
}
