// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod batch_id;
mod coordinator_event;
mod error_kind;
mod event_id;
mod eventbus;
mod identity;
mod request_id;
mod state_hash;
mod traits;

pub use batch_id::*;
pub use coordinator_event::*;
pub use error_kind::*;
pub use event_id::*;
pub use eventbus::*;
pub use identity::*;
pub use request_id::*;
pub use state_hash::*;
pub use traits::*;
