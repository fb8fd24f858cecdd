// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Aggregate, BatchLifecycle, CoordinatorError, CoordinatorResult, DecryptionOracle,
    ProofVerifier,
};
use alloy_primitives::{keccak256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_events::{BatchId, Identity, RequestId, StateHash};

const WORD: usize = 32;
const FIELDS: usize = 3;

/// keccak256 over the three handles in (work, personal, balance) order followed by the
/// coordinator identity.
pub fn compute_state_hash(aggregate: &Aggregate, salt: &Identity) -> StateHash {
    let mut preimage = Vec::with_capacity(FIELDS * WORD + salt.as_bytes().len());
    for handle in aggregate.ordered() {
        preimage.extend_from_slice(handle.as_bytes());
    }
    preimage.extend_from_slice(salt.as_bytes());
    StateHash::new(keccak256(&preimage))
}

/// Plaintext totals delivered by the oracle.
///
/// On the wire these are three 32 byte big-endian words in (work, personal, balance) order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecryptedTotals {
    pub work: u64,
    pub personal: u64,
    pub balance: u64,
}

impl DecryptedTotals {
    pub fn decode(cleartexts: &[u8]) -> Result<Self, String> {
        if cleartexts.len() != FIELDS * WORD {
            return Err(format!(
                "expected {} bytes of cleartexts but got {}",
                FIELDS * WORD,
                cleartexts.len()
            ));
        }

        let mut values = [0u64; FIELDS];
        for (value, word) in values.iter_mut().zip(cleartexts.chunks_exact(WORD)) {
            *value = u64::try_from(U256::from_be_slice(word))
                .map_err(|_| "cleartext word does not fit in 64 bits".to_string())?;
        }
        let [work, personal, balance] = values;

        Ok(Self {
            work,
            personal,
            balance,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        [self.work, self.personal, self.balance]
            .into_iter()
            .flat_map(|v| U256::from(v).to_be_bytes::<WORD>())
            .collect()
    }
}

/// Bookkeeping for one outstanding or finished decryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub state_hash: StateHash,
    pub processed: bool,
    pub requested_by: Identity,
    pub requested_at: u64,
    pub result: Option<DecryptedTotals>,
}

/// Issues oracle requests against the open batch and validates the answers.
///
/// A request captures a hash of the aggregate it was issued against. The callback is only
/// accepted if the request is known, has not been processed, the batch aggregate still hashes
/// to the captured value and the proof verifies. Only then is the request marked processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCoordinator {
    salt: Identity,
    contexts: BTreeMap<RequestId, DecryptionContext>,
}

impl DecryptionCoordinator {
    pub fn new(salt: Identity) -> Self {
        Self {
            salt,
            contexts: BTreeMap::new(),
        }
    }

    pub fn state_hash(&self, aggregate: &Aggregate) -> StateHash {
        compute_state_hash(aggregate, &self.salt)
    }

    pub fn context(&self, request_id: &RequestId) -> Option<&DecryptionContext> {
        self.contexts.get(request_id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &DecryptionContext> {
        self.contexts.values().filter(|ctx| !ctx.processed)
    }

    /// Highest request id ever issued, processed or not.
    pub fn last_request_id(&self) -> Option<RequestId> {
        self.contexts.keys().next_back().copied()
    }

    pub fn request(
        &mut self,
        batches: &BatchLifecycle,
        oracle: &mut dyn DecryptionOracle,
        requested_by: Identity,
        requested_at: u64,
    ) -> CoordinatorResult<DecryptionContext> {
        let batch = batches.ensure_open()?;
        let state_hash = self.state_hash(&batch.aggregate);
        let request_id = oracle
            .request(&batch.aggregate.ordered())
            .map_err(CoordinatorError::collaborator)?;

        if self.contexts.contains_key(&request_id) {
            return Err(CoordinatorError::DuplicateRequest(request_id));
        }

        let context = DecryptionContext {
            request_id,
            batch_id: batch.id,
            state_hash,
            processed: false,
            requested_by,
            requested_at,
            result: None,
        };
        self.contexts.insert(request_id, context.clone());
        Ok(context)
    }

    /// Returns the finalized context together with the decoded totals.
    pub fn on_callback(
        &mut self,
        batches: &BatchLifecycle,
        verifier: &dyn ProofVerifier,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &[u8],
    ) -> CoordinatorResult<(DecryptionContext, DecryptedTotals)> {
        let context = self
            .contexts
            .get(&request_id)
            .ok_or(CoordinatorError::UnknownRequest(request_id))?;

        if context.processed {
            return Err(CoordinatorError::ReplayAttempt(request_id));
        }

        let batch = batches.get(context.batch_id)?;
        let actual = self.state_hash(&batch.aggregate);
        if actual != context.state_hash {
            return Err(CoordinatorError::StateMismatch {
                batch_id: context.batch_id,
                expected: context.state_hash,
                actual,
            });
        }

        if !verifier.verify(request_id, cleartexts, proof) {
            return Err(CoordinatorError::DecryptionFailed {
                request_id,
                reason: "proof rejected".to_string(),
            });
        }

        let totals = DecryptedTotals::decode(cleartexts)
            .map_err(|reason| CoordinatorError::DecryptionFailed { request_id, reason })?;

        let context = self
            .contexts
            .get_mut(&request_id)
            .ok_or(CoordinatorError::UnknownRequest(request_id))?;
        context.processed = true;
        context.result = Some(totals);
        Ok((context.clone(), totals))
    }
}
