// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::borrow::Cow;

use crate::{Get, InMemStore, Insert, IntoKey, Remove, SledStore};
use actix::{Addr, Recipient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Proxy for the key value store actors. A DataStore points at one key (its scope) and can be
/// rescoped to child keys.
#[derive(Clone, Debug)]
pub struct DataStore {
    scope: Vec<u8>,
    get: Recipient<Get>,
    insert: Recipient<Insert>,
    remove: Recipient<Remove>,
}

impl DataStore {
    /// Read data at the scope location
    pub async fn read<T>(&self) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(bytes) = self.get.send(Get::new(&self.scope)).await? else {
            return Ok(None);
        };

        Ok(Some(bincode::deserialize(&bytes).with_context(|| {
            format!("Could not deserialize value at {}", self.get_scope())
        })?))
    }

    /// Writes data to the scope location without waiting for the store
    pub fn write<T: Serialize>(&self, value: T) {
        let Ok(serialized) = bincode::serialize(&value) else {
            error!("Could not serialize value passed to {}", self.get_scope());
            return;
        };
        self.insert.do_send(Insert::new(&self.scope, serialized))
    }

    /// Removes data from the scope location
    pub fn clear(&self) {
        self.remove.do_send(Remove::new(&self.scope))
    }

    pub fn get_scope(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.scope)
    }

    /// Changes the scope for the data store.
    /// Note that if the scope does not start with a slash one is appended.
    pub fn scope<K: IntoKey>(&self, key: K) -> Self {
        let mut scope = self.scope.clone();
        let encoded_key = key.into_key();
        if !encoded_key.starts_with(b"/") {
            scope.push(b'/');
        }
        scope.extend(encoded_key);
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Replace the scope with the given absolute key
    pub fn base<K: IntoKey>(&self, key: K) -> Self {
        Self {
            scope: key.into_key(),
            ..self.clone()
        }
    }
}

impl From<&Addr<SledStore>> for DataStore {
    fn from(addr: &Addr<SledStore>) -> Self {
        Self {
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            remove: addr.clone().recipient(),
            scope: vec![],
        }
    }
}

impl From<&Addr<InMemStore>> for DataStore {
    fn from(addr: &Addr<InMemStore>) -> Self {
        Self {
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            remove: addr.clone().recipient(),
            scope: vec![],
        }
    }
}
