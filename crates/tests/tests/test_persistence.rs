// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::Actor;
use anyhow::*;
use tally_coordinator::{
    local::LocalCollaborators, CoordinatorActor, CoordinatorError, CoordinatorGenesis,
    GetSnapshot, OpenBatch, OracleCallback, RequestDecryption, Submit,
};
use tally_data::{DataOp, DataStore, GetLog, SledStore};
use tally_events::{BatchId, CoordinatorEvent, EventBus, Identity, RequestId};
use tally_test_helpers::{create_shared_rng_from_u64, rand_identity, CoordinatorHarness};

#[actix::test]
async fn test_restart_keeps_replay_protection() -> Result<()> {
    let rng = create_shared_rng_from_u64(10);
    let mut h = CoordinatorHarness::new(&rng, 1, 60).await?;

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    h.coordinator
        .send(Submit {
            caller: h.owner,
            contribution: h.local.contribution(7, 3),
        })
        .await??;
    h.coordinator
        .send(RequestDecryption { caller: h.owner })
        .await??;

    let response = h
        .local
        .service()
        .answer_next()?
        .context("no queued request")?;
    let callback = OracleCallback::from(response);
    let totals = h.coordinator.send(callback.clone()).await??;
    assert_eq!(totals.balance, 10);

    let before = h.coordinator.send(GetSnapshot).await?;
    h.restart().await?;
    let after = h.coordinator.send(GetSnapshot).await?;
    assert_eq!(before, after);

    let replay = h.coordinator.send(callback.clone()).await?;
    assert_eq!(
        replay,
        Err(CoordinatorError::ReplayAttempt(callback.request_id))
    );
    Ok(())
}

#[actix::test]
async fn test_restart_keeps_cooldown_consumed_by_failure() -> Result<()> {
    let rng = create_shared_rng_from_u64(11);
    let mut h = CoordinatorHarness::new(&rng, 1, 60).await?;
    let provider = h.providers[0];
    let writes_before = h.mem_store.send(GetLog).await?.len();

    // No batch is open, but the submission still consumes the cooldown slot
    let res = h
        .coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await?;
    assert_eq!(res, Err(CoordinatorError::BatchNotOpen));

    // The failed operation was still checkpointed
    let writes = h.mem_store.send(GetLog).await?;
    assert_eq!(writes.len(), writes_before + 1);
    assert!(matches!(writes.last(), Some(DataOp::Insert(_))));

    h.restart().await?;
    h.coordinator.send(OpenBatch { caller: h.owner }).await??;

    let res = h
        .coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await?;
    assert!(matches!(res, Err(CoordinatorError::CooldownActive { .. })));

    h.local.clock.advance(h.cooldown_secs);
    h.coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await??;
    Ok(())
}

#[actix::test]
async fn test_pending_request_survives_restart() -> Result<()> {
    let rng = create_shared_rng_from_u64(12);
    let mut h = CoordinatorHarness::new(&rng, 0, 60).await?;

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    h.coordinator
        .send(Submit {
            caller: h.owner,
            contribution: h.local.contribution(2, 2),
        })
        .await??;
    let request_id = h
        .coordinator
        .send(RequestDecryption { caller: h.owner })
        .await??;

    h.restart().await?;
    let snapshot = h.coordinator.send(GetSnapshot).await?;
    assert_eq!(
        snapshot
            .decryptions
            .pending()
            .map(|c| c.request_id)
            .collect::<Vec<_>>(),
        vec![request_id]
    );

    // The oracle answers after the restart
    let totals = h.answer_next().await?.context("no queued request")??;
    assert_eq!(totals.balance, 4);
    Ok(())
}

#[actix::test]
async fn test_sled_backed_coordinator() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let rng = create_shared_rng_from_u64(13);
    let identity = rand_identity(&rng);
    let owner: Identity = rand_identity(&rng);
    let local = LocalCollaborators::new(0, [9u8; 32]);
    let bus = EventBus::<CoordinatorEvent>::new().start();
    let store = DataStore::from(&SledStore::new(dir.path())?);

    let coordinator = CoordinatorActor::attach(
        &bus,
        local.params(identity),
        CoordinatorGenesis::new(owner, 30),
        Some(&store),
    )
    .await?;
    coordinator.send(OpenBatch { caller: owner }).await??;
    coordinator
        .send(Submit {
            caller: owner,
            contribution: local.contribution(4, 1),
        })
        .await??;
    let before = coordinator.send(GetSnapshot).await?;

    let reloaded = CoordinatorActor::attach(
        &bus,
        local.params(identity),
        CoordinatorGenesis::new(owner, 30),
        Some(&store),
    )
    .await?;
    let after = reloaded.send(GetSnapshot).await?;
    assert_eq!(before, after);
    assert_eq!(after.batches.current_id(), BatchId::new(1));
    assert!(after.batches.is_open());
    Ok(())
}

#[actix::test]
async fn test_fresh_collaborators_resume_request_ids() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let rng = create_shared_rng_from_u64(14);
    let identity = rand_identity(&rng);
    let owner: Identity = rand_identity(&rng);
    let bus = EventBus::<CoordinatorEvent>::new().start();
    let store = DataStore::from(&SledStore::new(dir.path())?);

    let mut issued = vec![];
    for run in 0..2u64 {
        // Every run starts from new collaborators, as a restarted process would
        let local = LocalCollaborators::new(run * 1_000, [run as u8; 32]);
        let coordinator = CoordinatorActor::attach(
            &bus,
            local.params(identity),
            CoordinatorGenesis::new(owner, 30),
            Some(&store),
        )
        .await?;
        local.resume(&coordinator.send(GetSnapshot).await?)?;

        coordinator.send(OpenBatch { caller: owner }).await??;
        coordinator
            .send(Submit {
                caller: owner,
                contribution: local.contribution(run, 1),
            })
            .await??;
        issued.push(
            coordinator
                .send(RequestDecryption { caller: owner })
                .await??,
        );
    }

    assert_eq!(issued, vec![RequestId::new(1), RequestId::new(2)]);
    Ok(())
}
