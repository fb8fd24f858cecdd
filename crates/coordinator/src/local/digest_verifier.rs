// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ProofVerifier;
use derivative::Derivative;
use sha2::{Digest, Sha256};
use tally_events::RequestId;

/// Keyed SHA-256 over the request id and the cleartexts. The same key signs and verifies.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct DigestProofVerifier {
    #[derivative(Debug = "ignore")]
    key: [u8; 32],
}

impl DigestProofVerifier {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn sign(&self, request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(request_id.to_be_bytes());
        hasher.update(cleartexts);
        hasher.finalize().to_vec()
    }
}

impl ProofVerifier for DigestProofVerifier {
    fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        self.sign(request_id, cleartexts) == proof
    }
}
