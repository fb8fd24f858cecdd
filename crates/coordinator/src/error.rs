// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ActionKind;
use tally_events::{BatchId, ErrorKind, Identity, RequestId, StateHash};
use thiserror::Error;

/// Every way a coordinator operation can be rejected. A rejected operation leaves state
/// untouched, except for the cooldown slot consumed by a rate limited action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("{0} is not the owner")]
    NotOwner(Identity),

    #[error("{0} is not a provider")]
    NotProvider(Identity),

    #[error("Coordinator is paused")]
    Paused,

    #[error("No batch is open")]
    BatchNotOpen,

    #[error("Unknown batch {0}")]
    InvalidBatchId(BatchId),

    #[error("Cooldown active for {identity} ({action}), retry at {retry_at}")]
    CooldownActive {
        identity: Identity,
        action: ActionKind,
        retry_at: u64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request {0} has already been processed")]
    ReplayAttempt(RequestId),

    #[error("Aggregate of {batch_id} changed since the request: expected {expected}, found {actual}")]
    StateMismatch {
        batch_id: BatchId,
        expected: StateHash,
        actual: StateHash,
    },

    #[error("Unknown request {0}")]
    UnknownRequest(RequestId),

    #[error("Oracle returned request id {0} which is already in use")]
    DuplicateRequest(RequestId),

    #[error("Decryption failed for {request_id}: {reason}")]
    DecryptionFailed {
        request_id: RequestId,
        reason: String,
    },

    #[error("Collaborator failure: {0}")]
    Collaborator(String),
}

impl CoordinatorError {
    pub fn collaborator(err: anyhow::Error) -> Self {
        CoordinatorError::Collaborator(format!("{err:#}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::NotOwner(_) | CoordinatorError::NotProvider(_) => {
                ErrorKind::Authorization
            }
            CoordinatorError::Paused
            | CoordinatorError::BatchNotOpen
            | CoordinatorError::InvalidBatchId(_) => ErrorKind::State,
            CoordinatorError::CooldownActive { .. } => ErrorKind::RateLimit,
            CoordinatorError::InvalidConfig(_) => ErrorKind::Config,
            CoordinatorError::ReplayAttempt(_)
            | CoordinatorError::StateMismatch { .. }
            | CoordinatorError::UnknownRequest(_)
            | CoordinatorError::DuplicateRequest(_) => ErrorKind::Integrity,
            CoordinatorError::DecryptionFailed { .. } => ErrorKind::Verification,
            CoordinatorError::Collaborator(_) => ErrorKind::Collaborator,
        }
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        let id = Identity::ZERO;
        let req = RequestId::new(1);
        assert_eq!(CoordinatorError::NotOwner(id).kind(), ErrorKind::Authorization);
        assert_eq!(CoordinatorError::BatchNotOpen.kind(), ErrorKind::State);
        assert_eq!(
            CoordinatorError::CooldownActive {
                identity: id,
                action: ActionKind::Submission,
                retry_at: 60
            }
            .kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(CoordinatorError::ReplayAttempt(req).kind(), ErrorKind::Integrity);
        assert_eq!(
            CoordinatorError::DecryptionFailed {
                request_id: req,
                reason: "bad proof".into()
            }
            .kind(),
            ErrorKind::Verification
        );
        assert!(CoordinatorError::Paused.kind().is_caller_recoverable());
        assert!(!CoordinatorError::UnknownRequest(req).kind().is_caller_recoverable());
    }

    #[test]
    fn test_collaborator_keeps_context_chain() {
        let err = anyhow::anyhow!("socket closed").context("oracle request");
        assert_eq!(
            CoordinatorError::collaborator(err),
            CoordinatorError::Collaborator("oracle request: socket closed".into())
        );
    }
}
