// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, Identity, RequestId, StateHash};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A decryption request was handed to the oracle. The state hash pins the aggregate snapshot
/// the eventual callback is checked against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecryptionRequested {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub state_hash: StateHash,
    pub requested_by: Identity,
}

impl Display for DecryptionRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request_id: {}, batch_id: {}, state_hash: {}, requested_by: {}",
            self.request_id, self.batch_id, self.state_hash, self.requested_by
        )
    }
}
