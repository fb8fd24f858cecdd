// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CiphertextHandle, DecryptionOracle};
use anyhow::{anyhow, bail, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tally_events::RequestId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleRequest {
    pub request_id: RequestId,
    pub handles: Vec<CiphertextHandle>,
}

#[derive(Debug)]
struct OracleQueue {
    next_id: u64,
    online: bool,
    pending: VecDeque<OracleRequest>,
}

/// Oracle that only records requests. Clones share the queue so a service on the other side
/// can drain it and answer later. Ids are handed out sequentially starting at 1.
#[derive(Clone, Debug)]
pub struct QueuedOracle {
    inner: Arc<Mutex<OracleQueue>>,
}

impl QueuedOracle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(OracleQueue {
                next_id: 1,
                online: true,
                pending: VecDeque::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, OracleQueue>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("oracle queue lock poisoned"))
    }

    /// Force the id handed out by the next request.
    pub fn set_next_id(&self, id: u64) -> Result<()> {
        self.lock()?.next_id = id;
        Ok(())
    }

    /// Make sure ids handed out from now on come after `last`. Never moves the counter back.
    pub fn resume_after(&self, last: RequestId) -> Result<()> {
        let mut queue = self.lock()?;
        queue.next_id = queue.next_id.max(last.value().saturating_add(1));
        Ok(())
    }

    /// While offline every request fails.
    pub fn set_online(&self, online: bool) -> Result<()> {
        self.lock()?.online = online;
        Ok(())
    }

    pub fn pop(&self) -> Result<Option<OracleRequest>> {
        Ok(self.lock()?.pending.pop_front())
    }

    pub fn take_pending(&self) -> Result<Vec<OracleRequest>> {
        Ok(self.lock()?.pending.drain(..).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.pending.len())
    }
}

impl Default for QueuedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl DecryptionOracle for QueuedOracle {
    fn request(&mut self, handles: &[CiphertextHandle]) -> Result<RequestId> {
        let mut queue = self.lock()?;
        if !queue.online {
            bail!("decryption oracle is offline");
        }
        let request_id = RequestId::new(queue.next_id);
        queue.next_id += 1;
        queue.pending.push_back(OracleRequest {
            request_id,
            handles: handles.to_vec(),
        });
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_queue() -> Result<()> {
        let mut oracle = QueuedOracle::new();
        let observer = oracle.clone();
        assert_eq!(oracle.request(&[])?, RequestId::new(1));
        assert_eq!(oracle.request(&[])?, RequestId::new(2));
        assert_eq!(observer.len()?, 2);
        assert_eq!(observer.pop()?.map(|r| r.request_id), Some(RequestId::new(1)));

        observer.resume_after(RequestId::new(7))?;
        assert_eq!(oracle.request(&[])?, RequestId::new(8));
        observer.resume_after(RequestId::new(3))?;
        assert_eq!(oracle.request(&[])?, RequestId::new(9));

        observer.set_online(false)?;
        assert!(oracle.request(&[]).is_err());
        assert_eq!(observer.take_pending()?.len(), 3);
        Ok(())
    }
}
