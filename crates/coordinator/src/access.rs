// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CoordinatorError, CoordinatorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tally_events::Identity;

/// Global switches that the owner controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub paused: bool,
    pub cooldown_secs: u64,
}

impl GlobalConfig {
    pub fn new(cooldown_secs: u64, paused: bool) -> CoordinatorResult<Self> {
        ensure_cooldown(cooldown_secs)?;
        Ok(Self {
            paused,
            cooldown_secs,
        })
    }
}

fn ensure_cooldown(cooldown_secs: u64) -> CoordinatorResult<()> {
    if cooldown_secs == 0 {
        return Err(CoordinatorError::InvalidConfig(
            "cooldown must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Single owner plus a provider allow-list. All mutations are owner-only and idempotent; the
/// returned bool reports whether anything actually changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGuard {
    owner: Identity,
    providers: BTreeSet<Identity>,
    config: GlobalConfig,
}

impl AccessGuard {
    /// The owner starts out as a provider.
    pub fn new(owner: Identity, config: GlobalConfig) -> Self {
        Self {
            owner,
            providers: BTreeSet::from([owner]),
            config,
        }
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = Identity>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.owner == *identity
    }

    pub fn is_provider(&self, identity: &Identity) -> bool {
        self.providers.contains(identity)
    }

    pub fn providers(&self) -> &BTreeSet<Identity> {
        &self.providers
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn ensure_owner(&self, caller: &Identity) -> CoordinatorResult<()> {
        if !self.is_owner(caller) {
            return Err(CoordinatorError::NotOwner(*caller));
        }
        Ok(())
    }

    pub fn ensure_provider(&self, caller: &Identity) -> CoordinatorResult<()> {
        if !self.is_provider(caller) {
            return Err(CoordinatorError::NotProvider(*caller));
        }
        Ok(())
    }

    pub fn ensure_not_paused(&self) -> CoordinatorResult<()> {
        if self.config.paused {
            return Err(CoordinatorError::Paused);
        }
        Ok(())
    }

    /// Hand over ownership and return the previous owner. The new owner is not validated.
    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        new_owner: Identity,
    ) -> CoordinatorResult<Identity> {
        self.ensure_owner(caller)?;
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }

    pub fn add_provider(&mut self, caller: &Identity, provider: Identity) -> CoordinatorResult<bool> {
        self.ensure_owner(caller)?;
        Ok(self.providers.insert(provider))
    }

    pub fn remove_provider(
        &mut self,
        caller: &Identity,
        provider: &Identity,
    ) -> CoordinatorResult<bool> {
        self.ensure_owner(caller)?;
        Ok(self.providers.remove(provider))
    }

    pub fn set_paused(&mut self, caller: &Identity, paused: bool) -> CoordinatorResult<bool> {
        self.ensure_owner(caller)?;
        if self.config.paused == paused {
            return Ok(false);
        }
        self.config.paused = paused;
        Ok(true)
    }

    pub fn set_cooldown(&mut self, caller: &Identity, cooldown_secs: u64) -> CoordinatorResult<bool> {
        self.ensure_owner(caller)?;
        ensure_cooldown(cooldown_secs)?;
        if self.config.cooldown_secs == cooldown_secs {
            return Ok(false);
        }
        self.config.cooldown_secs = cooldown_secs;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Identity {
        Identity::from([byte; 20])
    }

    fn guard() -> AccessGuard {
        AccessGuard::new(id(1), GlobalConfig::new(60, false).unwrap())
    }

    #[test]
    fn test_owner_is_initial_provider() {
        let guard = guard();
        assert!(guard.is_owner(&id(1)));
        assert!(guard.is_provider(&id(1)));
        assert!(!guard.is_provider(&id(2)));
    }

    #[test]
    fn test_provider_mutations_are_idempotent() {
        let mut guard = guard();
        assert!(guard.add_provider(&id(1), id(2)).unwrap());
        assert!(!guard.add_provider(&id(1), id(2)).unwrap());
        assert!(guard.remove_provider(&id(1), &id(2)).unwrap());
        assert!(!guard.remove_provider(&id(1), &id(2)).unwrap());
        assert!(!guard.is_provider(&id(2)));
    }

    #[test]
    fn test_non_owner_is_rejected() {
        let mut guard = guard();
        assert_eq!(
            guard.add_provider(&id(2), id(3)),
            Err(CoordinatorError::NotOwner(id(2)))
        );
        assert_eq!(
            guard.set_paused(&id(2), true),
            Err(CoordinatorError::NotOwner(id(2)))
        );
        assert_eq!(
            guard.transfer_ownership(&id(2), id(2)),
            Err(CoordinatorError::NotOwner(id(2)))
        );
        assert_eq!(guard, self::guard());
    }

    #[test]
    fn test_transfer_moves_owner_rights() {
        let mut guard = guard();
        assert_eq!(guard.transfer_ownership(&id(1), id(2)), Ok(id(1)));
        assert!(guard.ensure_owner(&id(2)).is_ok());
        assert!(guard.ensure_owner(&id(1)).is_err());
        // Provider status is untouched
        assert!(guard.is_provider(&id(1)));
        assert!(!guard.is_provider(&id(2)));
    }

    #[test]
    fn test_pause_toggle_reports_changes_only() {
        let mut guard = guard();
        assert!(!guard.set_paused(&id(1), false).unwrap());
        assert!(guard.set_paused(&id(1), true).unwrap());
        assert_eq!(guard.ensure_not_paused(), Err(CoordinatorError::Paused));
        assert!(!guard.set_paused(&id(1), true).unwrap());
    }

    #[test]
    fn test_zero_cooldown_is_invalid() {
        let mut guard = guard();
        assert!(matches!(
            guard.set_cooldown(&id(1), 0),
            Err(CoordinatorError::InvalidConfig(_))
        ));
        assert_eq!(guard.config().cooldown_secs, 60);
        assert!(guard.set_cooldown(&id(1), 30).unwrap());
        assert!(matches!(
            GlobalConfig::new(0, false),
            Err(CoordinatorError::InvalidConfig(_))
        ));
    }
}
