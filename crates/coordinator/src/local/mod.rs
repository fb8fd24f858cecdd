// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Deterministic in-process collaborators. They let the coordinator run end to end without a
//! real FHE backend or decryption network, which is what the simulator and the tests use.

mod decryption_service;
mod digest_verifier;
mod integer_engine;
mod manual_clock;
mod queued_oracle;

pub use decryption_service::*;
pub use digest_verifier::*;
pub use integer_engine::*;
pub use manual_clock::*;
pub use queued_oracle::*;

use crate::{Contribution, CoordinatorParams, CoordinatorState};
use anyhow::Result;
use std::sync::Arc;
use tally_events::Identity;

/// One of each local collaborator, wired so that the decryption service can answer what the
/// oracle queued.
#[derive(Clone, Debug)]
pub struct LocalCollaborators {
    pub engine: IntegerEngine,
    pub oracle: QueuedOracle,
    pub verifier: DigestProofVerifier,
    pub clock: ManualClock,
}

impl LocalCollaborators {
    pub fn new(start_time: u64, proof_key: [u8; 32]) -> Self {
        Self {
            engine: IntegerEngine::new(),
            oracle: QueuedOracle::new(),
            verifier: DigestProofVerifier::new(proof_key),
            clock: ManualClock::new(start_time),
        }
    }

    pub fn params(&self, identity: Identity) -> CoordinatorParams {
        CoordinatorParams {
            identity,
            engine: Arc::new(self.engine.clone()),
            oracle: Box::new(self.oracle.clone()),
            verifier: Arc::new(self.verifier.clone()),
            clock: Arc::new(self.clock.clone()),
        }
    }

    /// Line the fresh collaborators up with a coordinator state loaded from a store, so the
    /// oracle does not reissue request ids the state already knows.
    pub fn resume(&self, state: &CoordinatorState) -> Result<()> {
        if let Some(last) = state.decryptions.last_request_id() {
            self.oracle.resume_after(last)?;
        }
        Ok(())
    }

    pub fn service(&self) -> LocalDecryptionService {
        LocalDecryptionService::new(self.oracle.clone(), self.verifier.clone())
    }

    pub fn contribution(&self, work: u64, personal: u64) -> Contribution {
        Contribution {
            work: self.engine.encrypt(work),
            personal: self.engine.encrypt(personal),
        }
    }
}
