// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tally_events::Identity;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, EnvFilter};

pub type SharedRng = Arc<Mutex<StdRng>>;

pub fn create_shared_rng_from_u64(seed: u64) -> SharedRng {
    Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
}

/// Panics if another test thread panicked while holding the rng.
pub fn rand_identity(rng: &SharedRng) -> Identity {
    let bytes = rng
        .lock()
        .expect("shared rng lock poisoned")
        .gen::<[u8; 20]>();
    Identity::from(bytes)
}

pub fn create_random_identities(rng: &SharedRng, count: usize) -> Vec<Identity> {
    (0..count).map(|_| rand_identity(rng)).collect()
}

/// Route tracing output to the test writer for as long as the guard lives.
pub fn add_tracing() -> DefaultGuard {
    tracing::subscriber::set_default(
        fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_test_writer()
            .finish(),
    )
}
