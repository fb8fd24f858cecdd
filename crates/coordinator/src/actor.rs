// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Contribution, Coordinator, CoordinatorGenesis, CoordinatorParams, CoordinatorResult,
    CoordinatorState, DecryptedTotals,
};
use actix::prelude::*;
use anyhow::Result;
use tally_data::{DataStore, Persistable, Repository};
use tally_events::{
    BatchId, CoordinatorEvent, CoordinatorFailed, EventBus, Identity, RequestId,
};
use tracing::{info, warn};

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<()>")]
pub struct TransferOwnership {
    pub caller: Identity,
    pub new_owner: Identity,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<()>")]
pub struct AddProvider {
    pub caller: Identity,
    pub provider: Identity,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<()>")]
pub struct RemoveProvider {
    pub caller: Identity,
    pub provider: Identity,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<()>")]
pub struct SetPaused {
    pub caller: Identity,
    pub paused: bool,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<()>")]
pub struct SetCooldown {
    pub caller: Identity,
    pub cooldown_secs: u64,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<BatchId>")]
pub struct OpenBatch {
    pub caller: Identity,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<BatchId>")]
pub struct CloseBatch {
    pub caller: Identity,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<BatchId>")]
pub struct Submit {
    pub caller: Identity,
    pub contribution: Contribution,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<RequestId>")]
pub struct RequestDecryption {
    pub caller: Identity,
}

/// Delivered by the decryption oracle once it has an answer.
#[derive(Message, Clone, Debug)]
#[rtype(result = "CoordinatorResult<DecryptedTotals>")]
pub struct OracleCallback {
    pub request_id: RequestId,
    pub cleartexts: Vec<u8>,
    pub proof: Vec<u8>,
}

#[derive(Message, Clone, Debug, Default)]
#[rtype(result = "CoordinatorState")]
pub struct GetSnapshot;

/// Serialises access to a [`Coordinator`], publishes its notifications on the event bus and
/// checkpoints its state after every message.
pub struct CoordinatorActor {
    coordinator: Coordinator,
    bus: Addr<EventBus<CoordinatorEvent>>,
    state: Option<Persistable<CoordinatorState>>,
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;
}

impl CoordinatorActor {
    pub fn new(
        coordinator: Coordinator,
        bus: &Addr<EventBus<CoordinatorEvent>>,
        state: Option<Persistable<CoordinatorState>>,
    ) -> Self {
        Self {
            coordinator,
            bus: bus.clone(),
            state,
        }
    }

    /// Start a coordinator. With a store, state is read from `//coordinator/{identity}` and the
    /// genesis is only used when nothing has been persisted yet.
    pub async fn attach(
        bus: &Addr<EventBus<CoordinatorEvent>>,
        params: CoordinatorParams,
        genesis: CoordinatorGenesis,
        store: Option<&DataStore>,
    ) -> Result<Addr<Self>> {
        let identity = params.identity;
        let Some(store) = store else {
            let coordinator = Coordinator::new(params, genesis)?;
            info!(%identity, "Coordinator started without persistence");
            return Ok(Self::new(coordinator, bus, None).start());
        };

        let repo: Repository<CoordinatorState> =
            Repository::new(store.base(format!("//coordinator/{identity}")));
        let state = Persistable::load_or_else(&repo, || {
            Ok(CoordinatorState::genesis(identity, &genesis)?)
        })
        .await?;
        let coordinator = Coordinator::from_state(params, state.try_get()?);
        info!(
            %identity,
            batch_id = %coordinator.state().batches.current_id(),
            "Coordinator started"
        );

        Ok(Self::new(coordinator, bus, Some(state)).start())
    }

    fn dispatch<T, F>(&mut self, operation: &str, f: F) -> CoordinatorResult<T>
    where
        F: FnOnce(&mut Coordinator) -> CoordinatorResult<T>,
    {
        let result = f(&mut self.coordinator);

        for event in self.coordinator.drain_events() {
            self.bus.do_send(event);
        }

        if let Err(err) = &result {
            warn!(operation, error = %err, "Operation rejected");
            self.bus.do_send(CoordinatorEvent::from(CoordinatorFailed {
                operation: operation.to_string(),
                kind: err.kind(),
                message: err.to_string(),
            }));
        }

        // Rejected operations may still have consumed a cooldown slot
        self.checkpoint();
        result
    }

    fn checkpoint(&mut self) {
        if let Some(state) = &mut self.state {
            state.set(self.coordinator.snapshot());
        }
    }
}

impl Handler<TransferOwnership> for CoordinatorActor {
    type Result = CoordinatorResult<()>;
    fn handle(&mut self, msg: TransferOwnership, _: &mut Self::Context) -> Self::Result {
        self.dispatch("transfer_ownership", |c| {
            c.transfer_ownership(msg.caller, msg.new_owner)
        })
    }
}

impl Handler<AddProvider> for CoordinatorActor {
    type Result = CoordinatorResult<()>;
    fn handle(&mut self, msg: AddProvider, _: &mut Self::Context) -> Self::Result {
        self.dispatch("add_provider", |c| c.add_provider(msg.caller, msg.provider))
    }
}

impl Handler<RemoveProvider> for CoordinatorActor {
    type Result = CoordinatorResult<()>;
    fn handle(&mut self, msg: RemoveProvider, _: &mut Self::Context) -> Self::Result {
        self.dispatch("remove_provider", |c| {
            c.remove_provider(msg.caller, msg.provider)
        })
    }
}

impl Handler<SetPaused> for CoordinatorActor {
    type Result = CoordinatorResult<()>;
    fn handle(&mut self, msg: SetPaused, _: &mut Self::Context) -> Self::Result {
        self.dispatch("set_paused", |c| c.set_paused(msg.caller, msg.paused))
    }
}

impl Handler<SetCooldown> for CoordinatorActor {
    type Result = CoordinatorResult<()>;
    fn handle(&mut self, msg: SetCooldown, _: &mut Self::Context) -> Self::Result {
        self.dispatch("set_cooldown", |c| {
            c.set_cooldown(msg.caller, msg.cooldown_secs)
        })
    }
}

impl Handler<OpenBatch> for CoordinatorActor {
    type Result = CoordinatorResult<BatchId>;
    fn handle(&mut self, msg: OpenBatch, _: &mut Self::Context) -> Self::Result {
        self.dispatch("open_batch", |c| c.open_batch(msg.caller))
    }
}

impl Handler<CloseBatch> for CoordinatorActor {
    type Result = CoordinatorResult<BatchId>;
    fn handle(&mut self, msg: CloseBatch, _: &mut Self::Context) -> Self::Result {
        self.dispatch("close_batch", |c| c.close_batch(msg.caller))
    }
}

impl Handler<Submit> for CoordinatorActor {
    type Result = CoordinatorResult<BatchId>;
    fn handle(&mut self, msg: Submit, _: &mut Self::Context) -> Self::Result {
        self.dispatch("submit", |c| c.submit(msg.caller, msg.contribution))
    }
}

impl Handler<RequestDecryption> for CoordinatorActor {
    type Result = CoordinatorResult<RequestId>;
    fn handle(&mut self, msg: RequestDecryption, _: &mut Self::Context) -> Self::Result {
        self.dispatch("request_decryption", |c| c.request_decryption(msg.caller))
    }
}

impl Handler<OracleCallback> for CoordinatorActor {
    type Result = CoordinatorResult<DecryptedTotals>;
    fn handle(&mut self, msg: OracleCallback, _: &mut Self::Context) -> Self::Result {
        self.dispatch("oracle_callback", |c| {
            c.on_oracle_callback(msg.request_id, &msg.cleartexts, &msg.proof)
        })
    }
}

impl Handler<GetSnapshot> for CoordinatorActor {
    type Result = MessageResult<GetSnapshot>;
    fn handle(&mut self, _: GetSnapshot, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.coordinator.snapshot())
    }
}
