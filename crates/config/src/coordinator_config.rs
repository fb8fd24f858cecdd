// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::load_config::{find_in_parent, resolve_config_path, ConfigSource};
use crate::yaml::load_yaml_with_env;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use tally_events::Identity;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_NAME: &str = "tally.config.yaml";
pub const ENV_PREFIX: &str = "TALLY_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    InMem,
    Sled {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Name used in logs
    pub name: String,
    /// Identity of this coordinator. Salts every state hash.
    pub identity: Identity,
    pub owner: Identity,
    /// Providers besides the owner, who is always one
    pub providers: Vec<Identity>,
    pub cooldown_secs: u64,
    pub paused: bool,
    pub store: StoreConfig,
    #[serde(skip)]
    config_file: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "tally".to_string(),
            identity: Identity::ZERO,
            owner: Identity::ZERO,
            providers: vec![],
            cooldown_secs: 60,
            paused: false,
            store: StoreConfig::default(),
            config_file: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cooldown_secs == 0 {
            bail!("cooldown_secs must be greater than zero");
        }
        if self.owner.is_zero() {
            bail!("owner must be set to a non-zero address");
        }
        Ok(())
    }

    /// The file this configuration was read from, if any.
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Could not serialize configuration")
    }
}

pub struct OsDirs;
impl OsDirs {
    /// Falls back to the current directory on platforms without a config dir.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("tally"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load configuration from defaults, then the yaml file, then `TALLY_` prefixed environment
/// variables, and validate the result.
pub fn load_config(cli_file: Option<PathBuf>) -> Result<CoordinatorConfig> {
    let source = resolve_config_path(
        find_in_parent,
        &env::current_dir()?,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        cli_file.as_deref(),
    );

    let mut figment = Figment::from(Serialized::defaults(CoordinatorConfig::default()));
    let config_file = match &source {
        ConfigSource::Explicit(path) => {
            let yaml = load_yaml_with_env(path).context("Configuration file not found")?;
            figment = figment.merge(Yaml::string(&yaml));
            Some(path.clone())
        }
        ConfigSource::Discovered(path) if path.exists() => {
            let yaml = load_yaml_with_env(path)?;
            figment = figment.merge(Yaml::string(&yaml));
            Some(path.clone())
        }
        ConfigSource::Discovered(path) => {
            debug!("No configuration at {}, using defaults", path.display());
            None
        }
    };

    let mut config: CoordinatorConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Could not parse configuration")?;
    config.config_file = config_file;

    config.validate().context("Invalid configuration")?;
    info!(name = %config.name, identity = %config.identity, "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io;

    const OWNER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const IDENTITY: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn isolate(jail: &mut Jail) {
        let home = jail.directory().to_string_lossy().to_string();
        jail.set_env("HOME", &home);
        jail.set_env("XDG_CONFIG_HOME", format!("{}/.config", home));
    }

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.name, "tally");
        assert_eq!(config.cooldown_secs, 60);
        assert!(!config.paused);
        assert_eq!(config.store, StoreConfig::InMem);
        // Zero owner is not usable
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_discovered_file() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                &format!(
                    r#"
name: alpha
identity: "{IDENTITY}"
owner: "{OWNER}"
providers:
  - "{IDENTITY}"
cooldown_secs: 30
store:
  type: sled
  path: ./db
"#
                ),
            )?;

            let config = load_config(None).map_err(|e| format!("{e:#}"))?;
            assert_eq!(config.name, "alpha");
            assert_eq!(config.owner, OWNER.parse::<Identity>().map_err(|e| e.to_string())?);
            assert_eq!(config.providers.len(), 1);
            assert_eq!(config.cooldown_secs, 30);
            assert_eq!(
                config.store,
                StoreConfig::Sled {
                    path: PathBuf::from("./db")
                }
            );
            assert!(config.config_file().is_some());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                "custom.yaml",
                &format!("owner: \"{OWNER}\"\ncooldown_secs: 30\n"),
            )?;
            jail.set_env("TALLY_COOLDOWN_SECS", "90");
            jail.set_env("TALLY_PAUSED", "true");

            let config =
                load_config(Some(PathBuf::from("custom.yaml"))).map_err(|e| format!("{e:#}"))?;
            assert_eq!(config.cooldown_secs, 90);
            assert!(config.paused);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_env_substitution() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.set_env("OWNER_ADDRESS", OWNER);
            jail.create_file(DEFAULT_CONFIG_NAME, "owner: \"${OWNER_ADDRESS}\"\n")?;

            let config = load_config(None).map_err(|e| format!("{e:#}"))?;
            assert_eq!(config.owner.to_string(), OWNER);
            Ok(())
        });
    }

    #[test]
    fn test_zero_cooldown_is_rejected() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                &format!("owner: \"{OWNER}\"\ncooldown_secs: 0\n"),
            )?;
            let err = load_config(None).expect_err("zero cooldown must fail");
            assert!(format!("{err:#}").contains("cooldown_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                &format!("owner: \"{OWNER}\"\ncooldown: 10\n"),
            )?;
            assert!(load_config(None).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_not_found() {
        Jail::expect_with(|jail| {
            isolate(jail);
            let err = load_config(Some(PathBuf::from("nope.yaml")))
                .expect_err("missing file must fail");
            let not_found = err
                .chain()
                .filter_map(|e| e.downcast_ref::<io::Error>())
                .any(|e| e.kind() == io::ErrorKind::NotFound);
            assert!(not_found);
            Ok(())
        });
    }

    #[test]
    fn test_missing_discovered_file_uses_defaults() {
        Jail::expect_with(|jail| {
            isolate(jail);
            // Defaults load fine but the zero owner does not validate
            let err = load_config(None).expect_err("default owner is zero");
            assert!(format!("{err:#}").contains("owner"));
            assert!(!err
                .chain()
                .filter_map(|e| e.downcast_ref::<io::Error>())
                .any(|e| e.kind() == io::ErrorKind::NotFound));
            Ok(())
        });
    }
}
