// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CoordinatorError, CoordinatorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tally_events::Identity;

/// Rate limited action classes. Each class keeps its own cooldown slot per identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Submission,
    DecryptionRequest,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Submission => write!(f, "submission"),
            ActionKind::DecryptionRequest => write!(f, "decryption-request"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiter {
    last_action: BTreeMap<(Identity, ActionKind), u64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_action(&self, identity: &Identity, kind: ActionKind) -> Option<u64> {
        self.last_action.get(&(*identity, kind)).copied()
    }

    /// Accept the action if `now >= last + cooldown` and record `now` as the new timestamp.
    ///
    /// The timestamp is recorded before the guarded operation runs, so a later failure of that
    /// operation still consumes the slot.
    pub fn check_and_record(
        &mut self,
        identity: &Identity,
        kind: ActionKind,
        now: u64,
        cooldown_secs: u64,
    ) -> CoordinatorResult<()> {
        if let Some(last) = self.last_action(identity, kind) {
            let retry_at = last.saturating_add(cooldown_secs);
            if now < retry_at {
                return Err(CoordinatorError::CooldownActive {
                    identity: *identity,
                    action: kind,
                    retry_at,
                });
            }
        }
        self.last_action.insert((*identity, kind), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALICE: Identity = Identity::ZERO;

    #[test]
    fn test_cooldown_boundary() {
        let mut limiter = RateLimiter::new();
        limiter
            .check_and_record(&ALICE, ActionKind::Submission, 0, 60)
            .unwrap();
        assert_eq!(
            limiter.check_and_record(&ALICE, ActionKind::Submission, 30, 60),
            Err(CoordinatorError::CooldownActive {
                identity: ALICE,
                action: ActionKind::Submission,
                retry_at: 60
            })
        );
        // Rejection does not move the slot
        assert_eq!(limiter.last_action(&ALICE, ActionKind::Submission), Some(0));
        limiter
            .check_and_record(&ALICE, ActionKind::Submission, 60, 60)
            .unwrap();
        assert_eq!(limiter.last_action(&ALICE, ActionKind::Submission), Some(60));
    }

    #[test]
    fn test_kinds_and_identities_are_independent() {
        let bob = Identity::from([2u8; 20]);
        let mut limiter = RateLimiter::new();
        limiter
            .check_and_record(&ALICE, ActionKind::Submission, 10, 60)
            .unwrap();
        limiter
            .check_and_record(&ALICE, ActionKind::DecryptionRequest, 10, 60)
            .unwrap();
        limiter
            .check_and_record(&bob, ActionKind::Submission, 10, 60)
            .unwrap();
        assert!(limiter
            .check_and_record(&bob, ActionKind::Submission, 11, 60)
            .is_err());
    }

    #[test]
    fn test_saturating_deadline() {
        let mut limiter = RateLimiter::new();
        limiter
            .check_and_record(&ALICE, ActionKind::Submission, u64::MAX - 1, 60)
            .unwrap();
        assert!(limiter
            .check_and_record(&ALICE, ActionKind::Submission, u64::MAX - 1, 60)
            .is_err());
        limiter
            .check_and_record(&ALICE, ActionKind::Submission, u64::MAX, 60)
            .unwrap();
    }

    proptest! {
        #[test]
        fn accepted_iff_cooldown_elapsed(
            first in 0u64..1_000_000,
            delta in 0u64..10_000,
            cooldown in 1u64..5_000,
        ) {
            let mut limiter = RateLimiter::new();
            limiter.check_and_record(&ALICE, ActionKind::Submission, first, cooldown).unwrap();
            let res = limiter.check_and_record(&ALICE, ActionKind::Submission, first + delta, cooldown);
            prop_assert_eq!(res.is_ok(), delta >= cooldown);
        }
    }
}
