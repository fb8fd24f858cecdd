// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, Identity};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContributionSubmitted {
    pub provider: Identity,
    pub batch_id: BatchId,
    pub submitted_at: u64,
}

impl Display for ContributionSubmitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider: {}, batch_id: {}, submitted_at: {}", self.provider, self.batch_id, self.submitted_at
        )
    }
}
