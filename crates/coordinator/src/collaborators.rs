// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::B256;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tally_events::RequestId;

/// Opaque reference to an encrypted value. Only the homomorphic engine can do anything with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(B256);

impl CiphertextHandle {
    pub fn new(handle: B256) -> Self {
        Self(handle)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for CiphertextHandle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Homomorphic arithmetic over ciphertext handles.
pub trait HomomorphicEngine: Send + Sync {
    /// An encryption of zero
    fn zero(&self) -> Result<CiphertextHandle>;
    /// Encrypted sum of two handles
    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle>;
}

/// Fire-and-forget entry point of the external decryption service. The service answers later by
/// invoking the coordinator's callback with the same request id.
pub trait DecryptionOracle: Send {
    fn request(&mut self, handles: &[CiphertextHandle]) -> Result<RequestId>;
}

/// Checks the proof that accompanies an oracle callback.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool;
}

/// Source of time for the rate limiter, in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock in unix seconds. Readings never go backwards: if the system clock is stepped
/// back, `now()` keeps returning the latest value seen until wall time catches up, so cooldowns
/// are not extended by the step.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn observe(&self, wall: u64) -> u64 {
        self.last.fetch_max(wall, Ordering::SeqCst).max(wall)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.observe(chrono::Utc::now().timestamp().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_never_steps_back() {
        let clock = SystemClock::new();
        assert_eq!(clock.observe(100), 100);
        assert_eq!(clock.observe(90), 100);
        assert_eq!(clock.observe(120), 120);
        assert!(clock.now() >= 120);
    }
}
