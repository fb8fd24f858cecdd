// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest binding a decryption request to the aggregate it was issued against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHash(B256);

impl StateHash {
    pub fn new(digest: B256) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> B256 {
        self.0
    }
}

impl From<B256> for StateHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
