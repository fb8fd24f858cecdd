// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod batch_closed;
mod batch_opened;
mod contribution_submitted;
mod cooldown_updated;
mod coordinator_failed;
mod decryption_completed;
mod decryption_requested;
mod ownership_transferred;
mod paused;
mod provider_added;
mod provider_removed;
mod unpaused;

pub use batch_closed::*;
pub use batch_opened::*;
pub use contribution_submitted::*;
pub use cooldown_updated::*;
pub use coordinator_failed::*;
pub use decryption_completed::*;
pub use decryption_requested::*;
pub use ownership_transferred::*;
pub use paused::*;
pub use provider_added::*;
pub use provider_removed::*;
pub use unpaused::*;

use crate::{BatchId, Event, EventId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to help define From traits for CoordinatorEvent
macro_rules! impl_from_event {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for CoordinatorEvent {
                fn from(data: $variant) -> Self {
                    CoordinatorEvent::$variant {
                        id: EventId::hash(data.clone()),
                        data,
                    }
                }
            }
        )*

        impl CoordinatorEvent {
            pub fn get_id(&self) -> EventId {
                match self {
                    $(CoordinatorEvent::$variant { id, .. } => id.clone(),)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(CoordinatorEvent::$variant { .. } => stringify!($variant),)*
                }
            }

            fn data_string(&self) -> String {
                match self {
                    $(CoordinatorEvent::$variant { data, .. } => data.to_string(),)*
                }
            }
        }
    };
}

/// Every observable transition of the coordinator.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub enum CoordinatorEvent {
    OwnershipTransferred {
        id: EventId,
        data: OwnershipTransferred,
    },
    ProviderAdded {
        id: EventId,
        data: ProviderAdded,
    },
    ProviderRemoved {
        id: EventId,
        data: ProviderRemoved,
    },
    Paused {
        id: EventId,
        data: Paused,
    },
    Unpaused {
        id: EventId,
        data: Unpaused,
    },
    CooldownUpdated {
        id: EventId,
        data: CooldownUpdated,
    },
    BatchOpened {
        id: EventId,
        data: BatchOpened,
    },
    BatchClosed {
        id: EventId,
        data: BatchClosed,
    },
    ContributionSubmitted {
        id: EventId,
        data: ContributionSubmitted,
    },
    DecryptionRequested {
        id: EventId,
        data: DecryptionRequested,
    },
    DecryptionCompleted {
        id: EventId,
        data: DecryptionCompleted,
    },
    CoordinatorFailed {
        id: EventId,
        data: CoordinatorFailed,
    },
}

impl_from_event!(
    OwnershipTransferred,
    ProviderAdded,
    ProviderRemoved,
    Paused,
    Unpaused,
    CooldownUpdated,
    BatchOpened,
    BatchClosed,
    ContributionSubmitted,
    DecryptionRequested,
    DecryptionCompleted,
    CoordinatorFailed
);

impl CoordinatorEvent {
    /// The batch this event concerns, if any
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            CoordinatorEvent::BatchOpened { data, .. } => Some(data.batch_id),
            CoordinatorEvent::BatchClosed { data, .. } => Some(data.batch_id),
            CoordinatorEvent::ContributionSubmitted { data, .. } => Some(data.batch_id),
            CoordinatorEvent::DecryptionRequested { data, .. } => Some(data.batch_id),
            CoordinatorEvent::DecryptionCompleted { data, .. } => Some(data.batch_id),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CoordinatorEvent::CoordinatorFailed { .. })
    }
}

impl Event for CoordinatorEvent {
    type Id = EventId;

    fn event_type(&self) -> String {
        self.name().to_string()
    }

    fn event_id(&self) -> Self::Id {
        self.get_id()
    }
}

impl fmt::Display for CoordinatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.data_string())
    }
}
