// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Repository;
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};

pub trait PersistableData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<T> PersistableData for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A container that automatically persists it's content every time it is mutated or changed.
#[derive(Debug)]
pub struct Persistable<T> {
    data: Option<T>,
    repo: Repository<T>,
}

impl<T> Persistable<T>
where
    T: PersistableData,
{
    /// Create a new container with the given option data and repository
    pub fn new(data: Option<T>, repo: &Repository<T>) -> Self {
        Self {
            data,
            repo: repo.clone(),
        }
    }

    /// Load data from the repository to the container
    pub async fn load(repo: &Repository<T>) -> Result<Self> {
        let data = repo.read().await?;
        Ok(Self::new(data, repo))
    }

    /// Load the data from the repo or save and sync the result of the given callback
    pub async fn load_or_else<F>(repo: &Repository<T>, f: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T>,
    {
        let data = match repo.read().await? {
            Some(data) => data,
            None => f()?,
        };

        let instance = Self::new(Some(data), repo);
        Ok(instance.save())
    }

    /// Save the data in the container to the database
    pub fn save(self) -> Self {
        self.checkpoint();
        self
    }

    /// Set the data on both the persistable and the repository.
    pub fn set(&mut self, data: T) {
        self.data = Some(data);
        self.checkpoint();
    }

    /// Clear the data from both the persistable and the repository.
    pub fn clear(&mut self) {
        self.data = None;
        self.repo.clear();
    }

    /// Get the data currently stored on the container as an Option<T>
    pub fn get(&self) -> Option<T> {
        self.data.clone()
    }

    /// Get the data from the container or return an error.
    pub fn try_get(&self) -> Result<T> {
        self.data
            .clone()
            .ok_or(anyhow!("Data was not set on container."))
    }

    /// Returns true if there is data on the container and false if there is not.
    pub fn has(&self) -> bool {
        self.data.is_some()
    }

    fn checkpoint(&self) {
        if let Some(data) = &self.data {
            self.repo.write(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataStore, InMemStore};
    use actix::Actor;

    fn repo() -> Repository<Vec<u64>> {
        let addr = InMemStore::new(false).start();
        Repository::new(DataStore::from(&addr).base("//seq"))
    }

    #[actix::test]
    async fn test_load_or_else_seeds_and_persists() -> Result<()> {
        let repo = repo();
        let container = Persistable::load_or_else(&repo, || Ok(vec![1])).await?;
        assert_eq!(container.get(), Some(vec![1]));
        assert_eq!(repo.read().await?, Some(vec![1]));

        // Second load sees the persisted value rather than the callback
        let container = Persistable::load_or_else(&repo, || Ok(vec![99])).await?;
        assert_eq!(container.try_get()?, vec![1]);
        Ok(())
    }

    #[actix::test]
    async fn test_set_and_clear_unset_container() -> Result<()> {
        let repo = repo();
        let mut container = Persistable::<Vec<u64>>::load(&repo).await?;
        assert!(!container.has());
        assert!(container.try_get().is_err());

        container.set(vec![7]);
        assert!(container.has());
        container.clear();
        assert_eq!(repo.read().await?, None);
        Ok(())
    }
}
