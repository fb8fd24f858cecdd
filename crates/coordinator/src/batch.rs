// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CiphertextHandle, CoordinatorError, CoordinatorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_events::BatchId;

/// The three encrypted running totals of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub work: CiphertextHandle,
    pub personal: CiphertextHandle,
    pub balance: CiphertextHandle,
}

impl Aggregate {
    /// Handles in the canonical (work, personal, balance) order used for hashing and decryption.
    pub fn ordered(&self) -> [CiphertextHandle; 3] {
        [self.work, self.personal, self.balance]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub open: bool,
    pub aggregate: Aggregate,
    pub contributions: u64,
}

/// Tracks the batch sequence. Ids are strictly increasing, at most one batch is open and a
/// closed batch keeps its final aggregate for as long as the coordinator lives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLifecycle {
    current: BatchId,
    batches: BTreeMap<BatchId, Batch>,
}

impl BatchLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> BatchId {
        self.current
    }

    pub fn current(&self) -> Option<&Batch> {
        self.batches.get(&self.current)
    }

    pub fn is_open(&self) -> bool {
        self.current().map(|b| b.open).unwrap_or(false)
    }

    pub fn get(&self, id: BatchId) -> CoordinatorResult<&Batch> {
        self.batches
            .get(&id)
            .ok_or(CoordinatorError::InvalidBatchId(id))
    }

    pub fn ensure_open(&self) -> CoordinatorResult<&Batch> {
        match self.current() {
            Some(batch) if batch.open => Ok(batch),
            _ => Err(CoordinatorError::BatchNotOpen),
        }
    }

    /// Start the next batch from the given zero aggregate. Returns the new id together with the
    /// id of a batch that had to be closed to make room, if any.
    pub fn open(&mut self, zero: Aggregate) -> (BatchId, Option<BatchId>) {
        let superseded = self.close().ok();
        let id = self.current.next();
        self.batches.insert(
            id,
            Batch {
                id,
                open: true,
                aggregate: zero,
                contributions: 0,
            },
        );
        self.current = id;
        (id, superseded)
    }

    /// Freeze the current batch.
    pub fn close(&mut self) -> CoordinatorResult<BatchId> {
        let batch = self
            .batches
            .get_mut(&self.current)
            .filter(|b| b.open)
            .ok_or(CoordinatorError::BatchNotOpen)?;
        batch.open = false;
        Ok(batch.id)
    }

    /// Replace the aggregate of the open batch after a contribution has been folded in.
    pub fn commit(&mut self, aggregate: Aggregate) -> CoordinatorResult<BatchId> {
        let batch = self
            .batches
            .get_mut(&self.current)
            .filter(|b| b.open)
            .ok_or(CoordinatorError::BatchNotOpen)?;
        batch.aggregate = aggregate;
        batch.contributions += 1;
        Ok(batch.id)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
