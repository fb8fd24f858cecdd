// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    AccessGuard, ActionKind, Aggregate, AggregationEngine, Batch, BatchLifecycle, Clock,
    Contribution, CoordinatorResult, DecryptedTotals, DecryptionContext, DecryptionCoordinator,
    DecryptionOracle, GlobalConfig, HomomorphicEngine, ProofVerifier, RateLimiter,
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_events::{
    BatchClosed, BatchId, BatchOpened, ContributionSubmitted, CooldownUpdated, CoordinatorEvent,
    DecryptionCompleted, DecryptionRequested, Identity, OwnershipTransferred, Paused,
    ProviderAdded, ProviderRemoved, RequestId, Unpaused,
};
use tracing::info;

/// Initial settings for a coordinator that has no persisted state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorGenesis {
    pub owner: Identity,
    pub providers: Vec<Identity>,
    pub cooldown_secs: u64,
    pub paused: bool,
}

impl CoordinatorGenesis {
    pub fn new(owner: Identity, cooldown_secs: u64) -> Self {
        Self {
            owner,
            providers: vec![],
            cooldown_secs,
            paused: false,
        }
    }
}

/// Everything that must survive a restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    pub access: AccessGuard,
    pub limiter: RateLimiter,
    pub batches: BatchLifecycle,
    pub decryptions: DecryptionCoordinator,
}

impl CoordinatorState {
    pub fn genesis(identity: Identity, genesis: &CoordinatorGenesis) -> CoordinatorResult<Self> {
        let config = GlobalConfig::new(genesis.cooldown_secs, genesis.paused)?;
        Ok(Self {
            access: AccessGuard::new(genesis.owner, config)
                .with_providers(genesis.providers.iter().copied()),
            limiter: RateLimiter::new(),
            batches: BatchLifecycle::new(),
            decryptions: DecryptionCoordinator::new(identity),
        })
    }
}

/// External services the coordinator depends on.
pub struct CoordinatorParams {
    /// Identity of this coordinator instance. Salts every state hash.
    pub identity: Identity,
    pub engine: Arc<dyn HomomorphicEngine>,
    pub oracle: Box<dyn DecryptionOracle>,
    pub verifier: Arc<dyn ProofVerifier>,
    pub clock: Arc<dyn Clock>,
}

/// The aggregation state machine. Every operation is atomic: it either applies fully and queues
/// its notifications, or fails and leaves state untouched (save for a consumed cooldown slot).
/// Queued notifications are collected with [`Coordinator::drain_events`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Coordinator {
    identity: Identity,
    state: CoordinatorState,
    #[derivative(Debug = "ignore")]
    aggregation: AggregationEngine,
    #[derivative(Debug = "ignore")]
    oracle: Box<dyn DecryptionOracle>,
    #[derivative(Debug = "ignore")]
    verifier: Arc<dyn ProofVerifier>,
    #[derivative(Debug = "ignore")]
    clock: Arc<dyn Clock>,
    events: Vec<CoordinatorEvent>,
}

impl Coordinator {
    pub fn new(params: CoordinatorParams, genesis: CoordinatorGenesis) -> CoordinatorResult<Self> {
        let state = CoordinatorState::genesis(params.identity, &genesis)?;
        Ok(Self::from_state(params, state))
    }

    pub fn from_state(params: CoordinatorParams, state: CoordinatorState) -> Self {
        Self {
            identity: params.identity,
            state,
            aggregation: AggregationEngine::new(params.engine),
            oracle: params.oracle,
            verifier: params.verifier,
            clock: params.clock,
            events: vec![],
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn snapshot(&self) -> CoordinatorState {
        self.state.clone()
    }

    /// Take the notifications queued by successful operations, oldest first.
    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: impl Into<CoordinatorEvent>) {
        self.events.push(event.into());
    }

    fn consume_cooldown(&mut self, caller: &Identity, kind: ActionKind) -> CoordinatorResult<u64> {
        let now = self.clock.now();
        let cooldown_secs = self.state.access.config().cooldown_secs;
        self.state
            .limiter
            .check_and_record(caller, kind, now, cooldown_secs)?;
        Ok(now)
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Identity,
        new_owner: Identity,
    ) -> CoordinatorResult<()> {
        let previous_owner = self.state.access.transfer_ownership(&caller, new_owner)?;
        info!(%previous_owner, %new_owner, "Ownership transferred");
        self.emit(OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    pub fn add_provider(&mut self, caller: Identity, provider: Identity) -> CoordinatorResult<()> {
        if self.state.access.add_provider(&caller, provider)? {
            info!(%provider, "Provider added");
            self.emit(ProviderAdded { provider });
        }
        Ok(())
    }

    pub fn remove_provider(
        &mut self,
        caller: Identity,
        provider: Identity,
    ) -> CoordinatorResult<()> {
        if self.state.access.remove_provider(&caller, &provider)? {
            info!(%provider, "Provider removed");
            self.emit(ProviderRemoved { provider });
        }
        Ok(())
    }

    pub fn set_paused(&mut self, caller: Identity, paused: bool) -> CoordinatorResult<()> {
        if self.state.access.set_paused(&caller, paused)? {
            info!(paused, "Pause flag changed");
            if paused {
                self.emit(Paused { by: caller });
            } else {
                self.emit(Unpaused { by: caller });
            }
        }
        Ok(())
    }

    pub fn set_cooldown(&mut self, caller: Identity, cooldown_secs: u64) -> CoordinatorResult<()> {
        if self.state.access.set_cooldown(&caller, cooldown_secs)? {
            info!(cooldown_secs, "Cooldown changed");
            self.emit(CooldownUpdated { cooldown_secs });
        }
        Ok(())
    }

    /// Start a new batch with all totals at zero. A batch that is still open gets closed first.
    pub fn open_batch(&mut self, caller: Identity) -> CoordinatorResult<BatchId> {
        self.state.access.ensure_not_paused()?;
        self.state.access.ensure_owner(&caller)?;
        let zero = self.aggregation.zero_aggregate()?;
        let (batch_id, superseded) = self.state.batches.open(zero);
        if let Some(batch_id) = superseded {
            info!(%batch_id, "Batch closed");
            self.emit(BatchClosed { batch_id });
        }
        info!(%batch_id, "Batch opened");
        self.emit(BatchOpened { batch_id });
        Ok(batch_id)
    }

    pub fn close_batch(&mut self, caller: Identity) -> CoordinatorResult<BatchId> {
        self.state.access.ensure_not_paused()?;
        self.state.access.ensure_owner(&caller)?;
        let batch_id = self.state.batches.close()?;
        info!(%batch_id, "Batch closed");
        self.emit(BatchClosed { batch_id });
        Ok(batch_id)
    }

    /// Fold a provider's encrypted contribution into the open batch.
    pub fn submit(
        &mut self,
        caller: Identity,
        contribution: Contribution,
    ) -> CoordinatorResult<BatchId> {
        self.state.access.ensure_not_paused()?;
        self.state.access.ensure_provider(&caller)?;
        let submitted_at = self.consume_cooldown(&caller, ActionKind::Submission)?;
        let batch_id = self
            .aggregation
            .fold(&mut self.state.batches, &contribution)?;
        info!(provider = %caller, %batch_id, "Contribution folded");
        self.emit(ContributionSubmitted {
            provider: caller,
            batch_id,
            submitted_at,
        });
        Ok(batch_id)
    }

    /// Ask the oracle to decrypt the open batch's totals. The result arrives later through
    /// [`Coordinator::on_oracle_callback`].
    pub fn request_decryption(&mut self, caller: Identity) -> CoordinatorResult<RequestId> {
        self.state.access.ensure_not_paused()?;
        self.state.access.ensure_provider(&caller)?;
        let requested_at = self.consume_cooldown(&caller, ActionKind::DecryptionRequest)?;
        let context = self.state.decryptions.request(
            &self.state.batches,
            self.oracle.as_mut(),
            caller,
            requested_at,
        )?;
        info!(
            request_id = %context.request_id,
            batch_id = %context.batch_id,
            "Decryption requested"
        );
        self.emit(DecryptionRequested {
            request_id: context.request_id,
            batch_id: context.batch_id,
            state_hash: context.state_hash,
            requested_by: caller,
        });
        Ok(context.request_id)
    }

    /// Accept the oracle's answer. Not subject to the pause flag.
    pub fn on_oracle_callback(
        &mut self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &[u8],
    ) -> CoordinatorResult<DecryptedTotals> {
        let (context, totals) = self.state.decryptions.on_callback(
            &self.state.batches,
            self.verifier.as_ref(),
            request_id,
            cleartexts,
            proof,
        )?;
        info!(%request_id, batch_id = %context.batch_id, "Decryption completed");
        self.emit(DecryptionCompleted {
            request_id,
            batch_id: context.batch_id,
            work: totals.work,
            personal: totals.personal,
            balance: totals.balance,
        });
        Ok(totals)
    }

    pub fn owner(&self) -> Identity {
        self.state.access.owner()
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.state.access.is_owner(identity)
    }

    pub fn is_provider(&self, identity: &Identity) -> bool {
        self.state.access.is_provider(identity)
    }

    pub fn providers(&self) -> Vec<Identity> {
        self.state.access.providers().iter().copied().collect()
    }

    pub fn config(&self) -> &GlobalConfig {
        self.state.access.config()
    }

    pub fn current_batch(&self) -> Option<&Batch> {
        self.state.batches.current()
    }

    pub fn batch(&self, id: BatchId) -> CoordinatorResult<&Batch> {
        self.state.batches.get(id)
    }

    pub fn current_aggregate(&self) -> Option<Aggregate> {
        self.current_batch().map(|batch| batch.aggregate)
    }

    pub fn decryption_context(&self, request_id: &RequestId) -> Option<&DecryptionContext> {
        self.state.decryptions.context(request_id)
    }

    /// Requests the oracle has not successfully answered yet.
    pub fn pending_requests(&self) -> Vec<&DecryptionContext> {
        self.state.decryptions.pending().collect()
    }

    pub fn last_action(&self, identity: &Identity, kind: ActionKind) -> Option<u64> {
        self.state.limiter.last_action(identity, kind)
    }
}
