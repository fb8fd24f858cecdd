// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad failure categories reported alongside a failed coordinator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Authorization,
    State,
    RateLimit,
    Config,
    Integrity,
    Verification,
    Collaborator,
}

impl ErrorKind {
    /// Authorization, state, rate-limit and config failures can be fixed by the caller.
    /// Integrity and verification failures are terminal for the request they concern.
    pub fn is_caller_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Authorization | ErrorKind::State | ErrorKind::RateLimit | ErrorKind::Config
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
