// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use super::{DigestProofVerifier, IntegerEngine, OracleRequest, QueuedOracle};
use crate::{DecryptedTotals, OracleCallback};
use anyhow::{bail, Result};
use tally_events::RequestId;

/// Payload the oracle delivers back to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleResponse {
    pub request_id: RequestId,
    pub cleartexts: Vec<u8>,
    pub proof: Vec<u8>,
}

impl From<OracleResponse> for OracleCallback {
    fn from(value: OracleResponse) -> Self {
        Self {
            request_id: value.request_id,
            cleartexts: value.cleartexts,
            proof: value.proof,
        }
    }
}

/// The far side of a [`QueuedOracle`]: decrypts queued requests and signs the results.
#[derive(Clone, Debug)]
pub struct LocalDecryptionService {
    oracle: QueuedOracle,
    verifier: DigestProofVerifier,
}

impl LocalDecryptionService {
    pub fn new(oracle: QueuedOracle, verifier: DigestProofVerifier) -> Self {
        Self { oracle, verifier }
    }

    pub fn answer(&self, request: &OracleRequest) -> Result<OracleResponse> {
        let [work, personal, balance] = match request.handles.as_slice() {
            [work, personal, balance] => [work, personal, balance].map(IntegerEngine::decrypt),
            handles => bail!(
                "expected three handles for {} but got {}",
                request.request_id,
                handles.len()
            ),
        };
        let cleartexts = DecryptedTotals {
            work,
            personal,
            balance,
        }
        .encode();
        let proof = self.verifier.sign(request.request_id, &cleartexts);

        Ok(OracleResponse {
            request_id: request.request_id,
            cleartexts,
            proof,
        })
    }

    pub fn answer_next(&self) -> Result<Option<OracleResponse>> {
        self.oracle
            .pop()?
            .map(|request| self.answer(&request))
            .transpose()
    }

    pub fn answer_all(&self) -> Result<Vec<OracleResponse>> {
        self.oracle
            .take_pending()?
            .iter()
            .map(|request| self.answer(request))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecryptionOracle, ProofVerifier};

    #[test]
    fn test_answer_becomes_verifiable_callback() -> Result<()> {
        let engine = IntegerEngine::new();
        let mut oracle = QueuedOracle::new();
        let verifier = DigestProofVerifier::new([3u8; 32]);
        let service = LocalDecryptionService::new(oracle.clone(), verifier.clone());

        let handles = [engine.encrypt(4), engine.encrypt(5), engine.encrypt(9)];
        let request_id = oracle.request(&handles)?;

        let callback = OracleCallback::from(service.answer_next()?.expect("queued request"));
        assert_eq!(callback.request_id, request_id);
        assert_eq!(
            DecryptedTotals::decode(&callback.cleartexts),
            Ok(DecryptedTotals {
                work: 4,
                personal: 5,
                balance: 9
            })
        );
        assert!(verifier.verify(request_id, &callback.cleartexts, &callback.proof));
        assert!(service.answer_next()?.is_none());
        Ok(())
    }

    #[test]
    fn test_answer_rejects_wrong_handle_count() -> Result<()> {
        let engine = IntegerEngine::new();
        let mut oracle = QueuedOracle::new();
        let service = LocalDecryptionService::new(oracle.clone(), DigestProofVerifier::new([0; 32]));
        oracle.request(&[engine.encrypt(1)])?;
        assert!(service.answer_next().is_err());
        Ok(())
    }
}
