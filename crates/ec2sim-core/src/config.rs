//! Configuration types for the resource store.
//!
//! This module provides the knobs that decide how closely the simulated
//! provider follows (or deviates from) the behaviour a client expects.

use serde::{Deserialize, Serialize};

use crate::model::InstanceStateName;

/// Owner id stamped on every group and reservation by default.
pub const DEFAULT_OWNER_ID: &str = "9876";

/// Domain appended to instance ids to form their DNS names.
pub const DEFAULT_DNS_SUFFIX: &str = "example.com";

/// Largest batch a single launch may create unless configured otherwise.
pub const DEFAULT_MAX_INSTANCES_PER_LAUNCH: u32 = 1000;

/// How a revoke that names an absent source is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevokePolicy {
    /// Absent sources are silently skipped.
    #[default]
    Lenient,
    /// Absent sources fail the call with `InvalidPermission.NotFound`.
    Strict,
}

/// Configuration for a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Account id reported as the owner of every group and reservation.
    pub owner_id: String,

    /// Create the provider's `default` group when the store is built or reset.
    pub default_group: bool,

    /// State newly launched instances start in.
    pub initial_instance_state: InstanceStateName,

    /// Suffix for instance DNS names (`<id>.<suffix>`).
    pub dns_suffix: String,

    /// Treatment of revokes naming sources that are not authorized.
    pub revoke_policy: RevokePolicy,

    /// Also refuse to delete groups still attached to live instances.
    ///
    /// Off by default: only references from other groups' permissions
    /// block deletion.
    pub protect_groups_used_by_instances: bool,

    /// Launches asking for more instances fail `InstanceLimitExceeded`.
    pub max_instances_per_launch: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            owner_id: DEFAULT_OWNER_ID.to_string(),
            default_group: true,
            initial_instance_state: InstanceStateName::Pending,
            dns_suffix: DEFAULT_DNS_SUFFIX.to_string(),
            revoke_policy: RevokePolicy::Lenient,
            protect_groups_used_by_instances: false,
            max_instances_per_launch: DEFAULT_MAX_INSTANCES_PER_LAUNCH,
        }
    }
}

impl StoreConfig {
    /// Create a store configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owner id.
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    /// Enable or disable the built-in `default` group.
    pub fn with_default_group(mut self, enabled: bool) -> Self {
        self.default_group = enabled;
        self
    }

    /// Set the state new instances start in.
    pub fn with_initial_instance_state(mut self, state: InstanceStateName) -> Self {
        self.initial_instance_state = state;
        self
    }

    /// Set the DNS suffix for instance names.
    pub fn with_dns_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.dns_suffix = suffix.into();
        self
    }

    /// Set the revoke policy.
    pub fn with_revoke_policy(mut self, policy: RevokePolicy) -> Self {
        self.revoke_policy = policy;
        self
    }

    /// Enable or disable instance-backed in-use protection.
    pub fn with_instance_protection(mut self, enabled: bool) -> Self {
        self.protect_groups_used_by_instances = enabled;
        self
    }

    /// Set the largest batch a single launch may create.
    pub fn with_max_instances_per_launch(mut self, limit: u32) -> Self {
        self.max_instances_per_launch = limit;
        self
    }

    /// A bare store: no default group, instances born running.
    ///
    /// Convenient for tests that count every entity they see.
    pub fn empty() -> Self {
        Self {
            default_group: false,
            initial_instance_state: InstanceStateName::Running,
            ..Self::default()
        }
    }

    /// A store that rejects every sloppy request it can detect.
    pub fn strict() -> Self {
        Self {
            revoke_policy: RevokePolicy::Strict,
            protect_groups_used_by_instances: true,
            ..Self::default()
        }
    }
}
