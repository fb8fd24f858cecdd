// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::*;
use tally_coordinator::{
    ActionKind, CloseBatch, CoordinatorError, DecryptedTotals, GetSnapshot, OpenBatch,
    OracleCallback, RequestDecryption, SetPaused, Submit,
};
use tally_events::{BatchId, CoordinatorEvent, ErrorKind, EventBus, GetEvents, RequestId, TakeEvents};
use tally_logger::SimpleLogger;
use tally_test_helpers::{add_tracing, create_shared_rng_from_u64, CoordinatorHarness};

fn failure_kind(event: &CoordinatorEvent) -> Option<ErrorKind> {
    match event {
        CoordinatorEvent::CoordinatorFailed { data, .. } => Some(data.kind),
        _ => None,
    }
}

#[actix::test]
async fn test_full_round_over_bus() -> Result<()> {
    let _guard = add_tracing();
    let rng = create_shared_rng_from_u64(42);
    let h = CoordinatorHarness::new(&rng, 2, 60).await?;
    SimpleLogger::<CoordinatorEvent>::attach("coordinator", &h.bus);

    let batch_id = h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    assert_eq!(batch_id, BatchId::new(1));

    let contributors = [h.owner, h.providers[0], h.providers[1]];
    for (i, caller) in contributors.iter().enumerate() {
        let value = i as u64 + 1;
        h.coordinator
            .send(Submit {
                caller: *caller,
                contribution: h.local.contribution(value * 10, value),
            })
            .await??;
    }

    let request_id = h
        .coordinator
        .send(RequestDecryption {
            caller: h.providers[0],
        })
        .await??;
    assert_eq!(request_id, RequestId::new(1));

    let totals = h.answer_next().await?.context("no queued request")??;
    assert_eq!(
        totals,
        DecryptedTotals {
            work: 60,
            personal: 6,
            balance: 66
        }
    );

    assert_eq!(
        h.take_event_types(6).await?,
        vec![
            "BatchOpened",
            "ContributionSubmitted",
            "ContributionSubmitted",
            "ContributionSubmitted",
            "DecryptionRequested",
            "DecryptionCompleted",
        ]
    );

    let snapshot = h.coordinator.send(GetSnapshot).await?;
    let context = snapshot
        .decryptions
        .context(&request_id)
        .context("context missing")?;
    assert!(context.processed);
    assert_eq!(context.result, Some(totals));
    assert_eq!(snapshot.decryptions.pending().count(), 0);
    Ok(())
}

#[actix::test]
async fn test_late_callback_is_rejected_and_reported() -> Result<()> {
    let rng = create_shared_rng_from_u64(1);
    let h = CoordinatorHarness::new(&rng, 1, 60).await?;
    let failures = EventBus::history_of(&h.bus, "CoordinatorFailed");

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    h.coordinator
        .send(Submit {
            caller: h.owner,
            contribution: h.local.contribution(5, 5),
        })
        .await??;
    let request_id = h
        .coordinator
        .send(RequestDecryption { caller: h.owner })
        .await??;

    // Another provider lands a contribution before the oracle answers
    h.coordinator
        .send(Submit {
            caller: h.providers[0],
            contribution: h.local.contribution(1, 1),
        })
        .await??;

    let result = h.answer_next().await?.context("no queued request")?;
    assert!(matches!(
        result,
        Err(CoordinatorError::StateMismatch { .. })
    ));

    let events = h.take_events(5).await?;
    let last = events.last().context("no events")?;
    assert_eq!(failure_kind(last), Some(ErrorKind::Integrity));

    // Only the failure reached the filtered collector
    let failed = failures.send(TakeEvents::new(1)).await?;
    assert_eq!(failure_kind(&failed[0]), Some(ErrorKind::Integrity));
    assert!(failures.send(GetEvents::new()).await?.is_empty());

    let snapshot = h.coordinator.send(GetSnapshot).await?;
    let pending: Vec<_> = snapshot.decryptions.pending().collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request_id, request_id);
    Ok(())
}

#[actix::test]
async fn test_replayed_callback_is_rejected() -> Result<()> {
    let rng = create_shared_rng_from_u64(2);
    let h = CoordinatorHarness::new(&rng, 0, 60).await?;

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    h.coordinator
        .send(RequestDecryption { caller: h.owner })
        .await??;

    let response = h
        .local
        .service()
        .answer_next()?
        .context("no queued request")?;
    let callback = OracleCallback::from(response);

    h.coordinator.send(callback.clone()).await??;
    let err = h
        .coordinator
        .send(callback.clone())
        .await?
        .err()
        .context("replay must fail")?;
    assert_eq!(err, CoordinatorError::ReplayAttempt(callback.request_id));
    Ok(())
}

#[actix::test]
async fn test_unknown_and_forged_callbacks() -> Result<()> {
    let rng = create_shared_rng_from_u64(3);
    let h = CoordinatorHarness::new(&rng, 0, 60).await?;

    let unknown = h
        .coordinator
        .send(OracleCallback {
            request_id: RequestId::new(99),
            cleartexts: DecryptedTotals::default().encode(),
            proof: vec![],
        })
        .await?;
    assert_eq!(
        unknown,
        Err(CoordinatorError::UnknownRequest(RequestId::new(99)))
    );

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    let request_id = h
        .coordinator
        .send(RequestDecryption { caller: h.owner })
        .await??;

    let forged = h
        .coordinator
        .send(OracleCallback {
            request_id,
            cleartexts: DecryptedTotals::default().encode(),
            proof: b"not a proof".to_vec(),
        })
        .await?
        .err()
        .context("forged proof must fail")?;
    assert_eq!(forged.kind(), ErrorKind::Verification);

    // The genuine answer still goes through
    let totals = h.answer_next().await?.context("no queued request")??;
    assert_eq!(totals, DecryptedTotals::default());
    Ok(())
}

#[actix::test]
async fn test_cooldown_and_pause_through_actor() -> Result<()> {
    let rng = create_shared_rng_from_u64(4);
    let h = CoordinatorHarness::new(&rng, 1, 60).await?;
    let provider = h.providers[0];

    h.coordinator.send(OpenBatch { caller: h.owner }).await??;
    h.coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await??;

    h.local.clock.advance(59);
    let err = h
        .coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await?
        .err()
        .context("cooldown must be active")?;
    assert!(matches!(
        err,
        CoordinatorError::CooldownActive {
            action: ActionKind::Submission,
            ..
        }
    ));

    h.local.clock.advance(1);
    h.coordinator
        .send(SetPaused {
            caller: h.owner,
            paused: true,
        })
        .await??;
    let err = h
        .coordinator
        .send(CloseBatch { caller: h.owner })
        .await?
        .err()
        .context("paused must reject")?;
    assert_eq!(err, CoordinatorError::Paused);

    h.coordinator
        .send(SetPaused {
            caller: h.owner,
            paused: false,
        })
        .await??;
    h.coordinator
        .send(Submit {
            caller: provider,
            contribution: h.local.contribution(1, 1),
        })
        .await??;
    let closed = h.coordinator.send(CloseBatch { caller: h.owner }).await??;
    assert_eq!(closed, BatchId::new(1));

    let snapshot = h.coordinator.send(GetSnapshot).await?;
    assert_eq!(snapshot.batches.get(closed)?.contributions, 2);
    Ok(())
}
