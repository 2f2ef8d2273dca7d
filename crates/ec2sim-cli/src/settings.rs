//! Layered configuration: defaults, then the TOML file, then flags.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use ec2sim_core::{InstanceStateName, RevokePolicy, StoreConfig};
use ec2sim_server::ServerConfig;

/// Contents of an `ec2sim.toml` file.
///
/// ```toml
/// [store]
/// owner_id = "123456789012"
/// initial_instance_state = "running"
///
/// [server]
/// bind_address = "127.0.0.1:8788"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub store: StoreConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config")
    }
}

/// Flags that override the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Address to listen on (port 0 picks a free port)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Account id that owns every resource
    #[arg(long)]
    pub owner_id: Option<String>,

    /// Do not seed the "default" security group
    #[arg(long)]
    pub no_default_group: bool,

    /// State new instances start in (pending, running, ...)
    #[arg(long)]
    pub initial_state: Option<InstanceStateName>,

    /// Reject revokes of rules that do not exist
    #[arg(long)]
    pub strict_revoke: bool,

    /// Refuse to delete groups used by live instances
    #[arg(long)]
    pub protect_instances: bool,

    /// Number of requests the journal keeps
    #[arg(long)]
    pub journal_capacity: Option<usize>,

    /// Largest number of instances one RunInstances call may launch
    #[arg(long)]
    pub max_instances_per_launch: Option<u32>,
}

impl Overrides {
    /// Apply the flags that were given on top of `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(addr) = self.bind {
            settings.server.bind_address = addr;
        }
        if let Some(capacity) = self.journal_capacity {
            settings.server.journal_capacity = capacity;
        }
        if let Some(owner) = &self.owner_id {
            settings.store.owner_id = owner.clone();
        }
        if let Some(limit) = self.max_instances_per_launch {
            settings.store.max_instances_per_launch = limit;
        }
        if let Some(state) = self.initial_state {
            settings.store.initial_instance_state = state;
        }
        if self.no_default_group {
            settings.store.default_group = false;
        }
        if self.strict_revoke {
            settings.store.revoke_policy = RevokePolicy::Strict;
        }
        if self.protect_instances {
            settings.store.protect_groups_used_by_instances = true;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let settings = Settings::parse(
            r#"
            [store]
            owner_id = "42"
            initial_instance_state = "running"

            [server]
            bind_address = "0.0.0.0:8788"
            "#,
        )
        .unwrap();

        assert_eq!(settings.store.owner_id, "42");
        assert_eq!(settings.store.initial_instance_state, InstanceStateName::Running);
        assert!(settings.store.default_group);
        assert_eq!(settings.server.bind_address.port(), 8788);
        assert_eq!(
            settings.server.journal_capacity,
            ServerConfig::default().journal_capacity
        );
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(Settings::parse("[storage]\nowner_id = \"1\"\n").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let file = Settings::parse("[store]\nowner_id = \"42\"\n").unwrap();
        let overrides = Overrides {
            owner_id: Some("7".to_string()),
            no_default_group: true,
            strict_revoke: true,
            max_instances_per_launch: Some(20),
            ..Overrides::default()
        };
        let settings = overrides.apply(file);

        assert_eq!(settings.store.owner_id, "7");
        assert!(!settings.store.default_group);
        assert_eq!(settings.store.revoke_policy, RevokePolicy::Strict);
        assert_eq!(settings.store.max_instances_per_launch, 20);
        assert!(!settings.store.protect_groups_used_by_instances);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let settings = Overrides {
            initial_state: Some(InstanceStateName::Stopped),
            ..Overrides::default()
        }
        .apply(Settings::default());
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Some(Path::new("/nonexistent/ec2sim.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
