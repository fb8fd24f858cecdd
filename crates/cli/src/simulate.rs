// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::dev::ToEnvelope;
use actix::prelude::*;
use anyhow::{bail, Context as _, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tally_config::{CoordinatorConfig, StoreConfig};
use tally_coordinator::{
    local::{LocalCollaborators, ManualClock},
    Clock, CoordinatorActor, CoordinatorError, CoordinatorGenesis, CoordinatorResult,
    DecryptedTotals, GetSnapshot, OpenBatch, OracleCallback, RequestDecryption, Submit,
    SystemClock,
};
use tally_data::{DataStore, InMemStore, SledStore};
use tally_events::{CoordinatorEvent, EventBus, Identity};
use tally_logger::SimpleLogger;
use tracing::{info, instrument};

/// Contribution values stay small so the printed totals are easy to check by eye.
const MAX_CONTRIBUTION: u64 = 1_000;

fn open_store(config: &StoreConfig) -> Result<DataStore> {
    Ok(match config {
        StoreConfig::InMem => DataStore::from(&InMemStore::new(false).start()),
        StoreConfig::Sled { path } => DataStore::from(&SledStore::new(path)?),
    })
}

/// Owner first, then every configured provider that is not the owner.
fn contributors(config: &CoordinatorConfig) -> Vec<Identity> {
    let mut contributors = vec![config.owner];
    for provider in &config.providers {
        if !contributors.contains(provider) {
            contributors.push(*provider);
        }
    }
    contributors
}

/// Send a message and, when the caller is still cooling down, move the manual clock to the
/// reported retry time and send it again.
async fn send_after_cooldown<M, T>(
    coordinator: &Addr<CoordinatorActor>,
    clock: &ManualClock,
    msg: M,
) -> Result<T>
where
    M: Message<Result = CoordinatorResult<T>> + Clone + Send + 'static,
    T: Send + 'static,
    CoordinatorActor: Handler<M>,
    <CoordinatorActor as Actor>::Context: ToEnvelope<CoordinatorActor, M>,
{
    loop {
        match coordinator.send(msg.clone()).await? {
            Err(CoordinatorError::CooldownActive {
                identity, retry_at, ..
            }) => {
                info!(%identity, retry_at, "Waiting out cooldown");
                clock.set(retry_at);
            }
            res => return Ok(res?),
        }
    }
}

#[instrument(skip_all)]
pub async fn execute(config: &CoordinatorConfig, contributions: u64, seed: Option<u64>) -> Result<()> {
    let bus = EventBus::<CoordinatorEvent>::new().start();
    SimpleLogger::<CoordinatorEvent>::attach(&config.name, &bus);
    let store = open_store(&config.store)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let local = LocalCollaborators::new(SystemClock::new().now(), rng.gen());

    let genesis = CoordinatorGenesis {
        owner: config.owner,
        providers: config.providers.clone(),
        cooldown_secs: config.cooldown_secs,
        paused: config.paused,
    };
    let coordinator =
        CoordinatorActor::attach(&bus, local.params(config.identity), genesis, Some(&store))
            .await?;

    // A persisted store may already hold requests from earlier runs
    let snapshot = coordinator.send(GetSnapshot).await?;
    local.resume(&snapshot)?;

    let batch_id = send_after_cooldown(
        &coordinator,
        &local.clock,
        OpenBatch {
            caller: config.owner,
        },
    )
    .await
    .context("Could not open a batch")?;
    println!("Opened batch {batch_id}");

    let contributors = contributors(config);
    let mut expected = DecryptedTotals::default();
    for (caller, _) in contributors.iter().cycle().zip(0..contributions) {
        let work = rng.gen_range(0..MAX_CONTRIBUTION);
        let personal = rng.gen_range(0..MAX_CONTRIBUTION);
        send_after_cooldown(
            &coordinator,
            &local.clock,
            Submit {
                caller: *caller,
                contribution: local.contribution(work, personal),
            },
        )
        .await
        .with_context(|| format!("Contribution from {caller} was rejected"))?;
        expected.work = expected.work.wrapping_add(work);
        expected.personal = expected.personal.wrapping_add(personal);
        println!("  {caller} contributed work={work} personal={personal}");
    }
    expected.balance = expected.work.wrapping_add(expected.personal);

    let request_id = send_after_cooldown(
        &coordinator,
        &local.clock,
        RequestDecryption {
            caller: config.owner,
        },
    )
    .await
    .context("Could not request a decryption")?;
    println!("Requested decryption {request_id}");

    let response = local
        .service()
        .answer_next()?
        .context("The oracle did not receive the decryption request")?;
    let totals = coordinator
        .send(OracleCallback::from(response))
        .await?
        .context("The oracle callback was rejected")?;

    println!(
        "Batch {batch_id} totals: work={} personal={} balance={}",
        totals.work, totals.personal, totals.balance
    );

    if totals != expected {
        bail!("Decrypted totals {totals:?} do not match the submitted values {expected:?}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix::test]
    async fn test_repeated_runs_share_a_sled_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = CoordinatorConfig::default();
        config.owner = Identity::from([1u8; 20]);
        config.providers = vec![Identity::from([2u8; 20])];
        config.store = StoreConfig::Sled {
            path: dir.path().join("tally.db"),
        };

        execute(&config, 3, Some(1)).await?;
        // The second run reloads the first run's decryption contexts
        execute(&config, 2, Some(2)).await?;
        Ok(())
    }
}
