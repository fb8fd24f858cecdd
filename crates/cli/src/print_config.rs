// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use tally_config::CoordinatorConfig;

pub fn execute(config: &CoordinatorConfig) -> Result<()> {
    if let Some(file) = config.config_file() {
        println!("# {}", file.display());
    }
    print!("{}", config.to_yaml()?);
    Ok(())
}
