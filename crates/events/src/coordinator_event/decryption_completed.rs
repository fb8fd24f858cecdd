// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The oracle answered a request with a verified result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecryptionCompleted {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub work: u64,
    pub personal: u64,
    pub balance: u64,
}

impl Display for DecryptionCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request_id: {}, batch_id: {}, work: {}, personal: {}, balance: {}",
            self.request_id, self.batch_id, self.work, self.personal, self.balance
        )
    }
}
