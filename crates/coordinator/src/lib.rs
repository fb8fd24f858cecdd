// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod access;
mod actor;
mod aggregation;
mod batch;
mod collaborators;
mod coordinator;
mod decryption;
mod error;
pub mod local;
mod rate_limit;

pub use access::*;
pub use actor::*;
pub use aggregation::*;
pub use batch::*;
pub use collaborators::*;
pub use coordinator::*;
pub use decryption::*;
pub use error::*;
pub use rate_limit::*;
