//! LMDB environment setup.

use std::path::Path;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";
const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
#[derive(Clone)]
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    /// `u64` sequence (big-endian) → bincode `Candidate`.
    pub(crate) candidates_db: Database<Bytes, Bytes>,
    /// Blake2b-256 of the candidate name → `u64` sequence (big-endian).
    pub(crate) names_db: Database<Bytes, Bytes>,
    /// Blake2b-256 of the account → bincode `RecordedVote`.
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// Candidate id → `u64` vote count (little-endian).
    pub(crate) counts_db: Database<Str, Bytes>,
    /// Counters and schema version.
    pub(crate) meta_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path per process; the
        // ledger never hands out references that outlive their transaction.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let candidates_db = env.create_database(&mut wtxn, Some("candidates"))?;
        let names_db = env.create_database(&mut wtxn, Some("candidate_names"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let counts_db = env.create_database(&mut wtxn, Some("vote_counts"))?;
        let meta_db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let stored = match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => decode_u32(bytes)?,
            None => 0,
        };
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored < CURRENT_SCHEMA_VERSION {
            tracing::info!(from = stored, to = CURRENT_SCHEMA_VERSION, "initialising ledger schema");
            meta_db.put(
                &mut wtxn,
                SCHEMA_VERSION_KEY,
                &CURRENT_SCHEMA_VERSION.to_le_bytes(),
            )?;
        }
        wtxn.commit()?;

        Ok(Self {
            env,
            candidates_db,
            names_db,
            votes_db,
            counts_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}

fn decode_u32(bytes: &[u8]) -> Result<u32, LmdbError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("schema_version has unexpected byte length".into()))?;
    Ok(u32::from_le_bytes(arr))
}

pub(crate) fn decode_u64(bytes: &[u8], what: &str) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("{what} has unexpected byte length")))?;
    Ok(u64::from_le_bytes(arr))
}
