// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{create_random_identities, rand_identity, SharedRng};
use actix::{Actor, Addr};
use anyhow::Result;
use std::time::Duration;
use tally_coordinator::{
    local::LocalCollaborators, CoordinatorActor, CoordinatorGenesis, CoordinatorResult,
    DecryptedTotals, OracleCallback,
};
use tally_data::{DataStore, InMemStore};
use tally_events::{
    CoordinatorEvent, Event, EventBus, GetEvents, HistoryCollector, Identity, TakeEvents,
};
use tokio::time::timeout;

pub const HARNESS_START_TIME: u64 = 1_700_000_000;
const PROOF_KEY: [u8; 32] = [42u8; 32];

/// A coordinator actor wired to a bus, a history collector, a capturing in-memory store and the
/// local collaborators. Identities come from the given rng so runs are reproducible.
///
/// ```ignore
/// let rng = create_shared_rng_from_u64(42);
/// let harness = CoordinatorHarness::new(&rng, 2, 60).await?;
/// harness.coordinator.send(OpenBatch { caller: harness.owner }).await??;
/// let events = harness.take_events(1).await?;
/// ```
pub struct CoordinatorHarness {
    pub bus: Addr<EventBus<CoordinatorEvent>>,
    pub history: Addr<HistoryCollector<CoordinatorEvent>>,
    pub store: DataStore,
    pub mem_store: Addr<InMemStore>,
    pub local: LocalCollaborators,
    pub identity: Identity,
    pub owner: Identity,
    pub providers: Vec<Identity>,
    pub cooldown_secs: u64,
    pub coordinator: Addr<CoordinatorActor>,
}

impl CoordinatorHarness {
    pub async fn new(rng: &SharedRng, provider_count: usize, cooldown_secs: u64) -> Result<Self> {
        let bus = EventBus::<CoordinatorEvent>::new().start();
        let history = EventBus::history(&bus);
        let mem_store = InMemStore::new(true).start();
        let store = DataStore::from(&mem_store);
        let local = LocalCollaborators::new(HARNESS_START_TIME, PROOF_KEY);
        let identity = rand_identity(rng);
        let owner = rand_identity(rng);
        let providers = create_random_identities(rng, provider_count);

        let genesis = CoordinatorGenesis {
            owner,
            providers: providers.clone(),
            cooldown_secs,
            paused: false,
        };
        let coordinator =
            CoordinatorActor::attach(&bus, local.params(identity), genesis, Some(&store)).await?;

        Ok(Self {
            bus,
            history,
            store,
            mem_store,
            local,
            identity,
            owner,
            providers,
            cooldown_secs,
            coordinator,
        })
    }

    fn genesis(&self) -> CoordinatorGenesis {
        CoordinatorGenesis {
            owner: self.owner,
            providers: self.providers.clone(),
            cooldown_secs: self.cooldown_secs,
            paused: false,
        }
    }

    /// Replace the running actor with a fresh one that loads from the same store.
    pub async fn restart(&mut self) -> Result<()> {
        self.coordinator = CoordinatorActor::attach(
            &self.bus,
            self.local.params(self.identity),
            self.genesis(),
            Some(&self.store),
        )
        .await?;
        Ok(())
    }

    /// Let the local decryption service answer the oldest queued request.
    pub async fn answer_next(&self) -> Result<Option<CoordinatorResult<DecryptedTotals>>> {
        let Some(response) = self.local.service().answer_next()? else {
            return Ok(None);
        };
        Ok(Some(
            self.coordinator
                .send(OracleCallback::from(response))
                .await?,
        ))
    }

    /// Wait for the next `amount` events to reach the history collector.
    pub async fn take_events(&self, amount: usize) -> Result<Vec<CoordinatorEvent>> {
        let events = timeout(
            Duration::from_secs(5),
            self.history.send(TakeEvents::new(amount)),
        )
        .await??;
        Ok(events)
    }

    /// Wait for the next `amount` events and return their types.
    pub async fn take_event_types(&self, amount: usize) -> Result<Vec<String>> {
        Ok(self
            .take_events(amount)
            .await?
            .iter()
            .map(|e| e.event_type())
            .collect())
    }

    /// Events that have arrived but have not been taken yet.
    pub async fn buffered_events(&self) -> Result<Vec<CoordinatorEvent>> {
        Ok(self.history.send(GetEvents::new()).await?)
    }
}
