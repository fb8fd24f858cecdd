// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::{Path, PathBuf};

use path_clean::clean;

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

pub fn find_in_parent(path: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = path.to_path_buf();

    loop {
        let file_path = current.join(filename);
        if file_path.exists() {
            return Some(file_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Where the configuration should be read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line. It must exist.
    Explicit(PathBuf),
    /// Found by searching or by falling back to the default location. It may not exist.
    Discovered(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => path,
        }
    }
}

pub fn resolve_config_path(
    find_in_parent: FindInParent,
    cwd: &Path,
    default_config_dir: &Path,
    default_filename: &str,
    cli_file: Option<&Path>,
) -> ConfigSource {
    if let Some(cli_file) = cli_file {
        // config is passed in and is absolute
        if cli_file.is_absolute() {
            return ConfigSource::Explicit(cli_file.to_path_buf());
        }

        // config is passed in and is relative
        return ConfigSource::Explicit(clean(cwd.join(cli_file)));
    }

    // search from cwd
    if let Some(found) = find_in_parent(cwd, default_filename) {
        return ConfigSource::Discovered(found);
    }

    // return default
    ConfigSource::Discovered(clean(default_config_dir.join(default_filename)))
}
