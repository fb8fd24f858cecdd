// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// An operation was rejected. Broadcast for observability only; the caller also receives the
/// error directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinatorFailed {
    pub operation: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl Display for CoordinatorFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation: {}, kind: {}, message: {}", self.operation, self.kind, self.message
        )
    }
}
