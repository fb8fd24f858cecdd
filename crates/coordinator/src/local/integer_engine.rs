// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CiphertextHandle, HomomorphicEngine};
use alloy_primitives::B256;
use anyhow::Result;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Plaintext stand-in for a homomorphic engine. A handle carries the value in its last eight
/// bytes and a fresh nonce in its first eight, so that every operation yields a new handle the
/// way a real ciphertext would. Arithmetic wraps.
#[derive(Clone, Debug, Default)]
pub struct IntegerEngine {
    nonce: Arc<AtomicU64>,
}

impl IntegerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encrypt(&self, value: u64) -> CiphertextHandle {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&nonce.to_be_bytes());
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        CiphertextHandle::new(B256::from(bytes))
    }

    pub fn decrypt(handle: &CiphertextHandle) -> u64 {
        let mut value = [0u8; 8];
        value.copy_from_slice(&handle.as_bytes()[24..]);
        u64::from_be_bytes(value)
    }
}

impl HomomorphicEngine for IntegerEngine {
    fn zero(&self) -> Result<CiphertextHandle> {
        Ok(self.encrypt(0))
    }

    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle> {
        Ok(self.encrypt(Self::decrypt(lhs).wrapping_add(Self::decrypt(rhs))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_fresh_per_operation() -> Result<()> {
        let engine = IntegerEngine::new();
        let a = engine.zero()?;
        let b = engine.zero()?;
        assert_ne!(a, b);
        assert_eq!(IntegerEngine::decrypt(&a), IntegerEngine::decrypt(&b));

        let sum = engine.add(&engine.encrypt(40), &engine.encrypt(2))?;
        assert_eq!(IntegerEngine::decrypt(&sum), 42);
        Ok(())
    }
}
