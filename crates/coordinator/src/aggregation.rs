// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Aggregate, BatchLifecycle, CiphertextHandle, CoordinatorError, CoordinatorResult,
    HomomorphicEngine,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_events::BatchId;

/// One provider submission: two encrypted values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub work: CiphertextHandle,
    pub personal: CiphertextHandle,
}

/// Folds contributions into the open batch through the homomorphic engine.
#[derive(Clone)]
pub struct AggregationEngine {
    engine: Arc<dyn HomomorphicEngine>,
}

impl AggregationEngine {
    pub fn new(engine: Arc<dyn HomomorphicEngine>) -> Self {
        Self { engine }
    }

    pub fn zero_aggregate(&self) -> CoordinatorResult<Aggregate> {
        Ok(Aggregate {
            work: self.zero()?,
            personal: self.zero()?,
            balance: self.zero()?,
        })
    }

    /// Add the contribution to the open batch. Balance is always re-derived from the new work
    /// and personal totals, never accumulated on its own.
    pub fn fold(
        &self,
        batches: &mut BatchLifecycle,
        contribution: &Contribution,
    ) -> CoordinatorResult<BatchId> {
        let current = batches.ensure_open()?.aggregate;

        let work = self.add(&current.work, &contribution.work)?;
        let personal = self.add(&current.personal, &contribution.personal)?;
        let balance = self.add(&work, &personal)?;

        batches.commit(Aggregate {
            work,
            personal,
            balance,
        })
    }

    fn zero(&self) -> CoordinatorResult<CiphertextHandle> {
        self.engine.zero().map_err(CoordinatorError::collaborator)
    }

    fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> CoordinatorResult<CiphertextHandle> {
        self.engine
            .add(lhs, rhs)
            .map_err(CoordinatorError::collaborator)
    }
}
