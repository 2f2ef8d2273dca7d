//! Simulated provider entities.
//!
//! Everything here is plain data. The [`ResourceStore`](crate::store::ResourceStore)
//! owns the canonical copies; callers only ever see clones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Ec2Error, Ec2Result};
use crate::ids::{GroupId, InstanceId, ReservationId};
use crate::permission::PermissionSet;

/// Instance type used when a launch request names none.
pub const DEFAULT_INSTANCE_TYPE: &str = "m1.small";

/// A security group as stored by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    /// Engine-generated id.
    pub id: GroupId,
    /// Unique name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning account.
    pub owner_id: String,
    /// Ingress rules.
    pub permissions: PermissionSet,
}

impl SecurityGroup {
    /// The canonical `{id, name, owner}` triple of this group.
    pub fn as_user_group(&self) -> UserGroup {
        UserGroup {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
        }
    }

    /// The `{id, name}` pair of this group.
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Ingress rules in listing form, sources sorted.
    pub fn ip_permissions(&self) -> Vec<IpPermission> {
        self.permissions.to_ip_permissions()
    }
}

/// A fully resolved source-group reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: GroupId,
    pub name: String,
    pub owner_id: String,
}

/// A group's id and name, as attached to an instance or reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
}

/// A reference to a security group by id, name, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: Option<GroupId>,
    pub name: Option<String>,
}

impl GroupRef {
    /// Reference a group by id.
    pub fn by_id(id: impl Into<GroupId>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    /// Reference a group by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Reference a group by both id and name; they must agree.
    pub fn by_both(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Whether neither field is set.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.id, &self.name) {
            (Some(id), Some(name)) => write!(f, "{}:{}", id, name),
            (Some(id), None) => write!(f, "{}", id),
            (None, Some(name)) => f.write_str(name),
            (None, None) => f.write_str("<empty>"),
        }
    }
}

impl From<&SecurityGroup> for GroupRef {
    fn from(group: &SecurityGroup) -> Self {
        Self::by_both(group.id.clone(), group.name.clone())
    }
}

/// A source-group reference inside an incoming permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupRef {
    pub id: Option<GroupId>,
    pub name: Option<String>,
    pub owner_id: Option<String>,
}

impl UserGroupRef {
    /// Reference a source group by id.
    pub fn by_id(id: impl Into<GroupId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Reference a source group by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Attach an explicit owner id.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// The id/name part of this reference.
    pub fn group_ref(&self) -> GroupRef {
        GroupRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<&SecurityGroup> for UserGroupRef {
    fn from(group: &SecurityGroup) -> Self {
        Self {
            id: Some(group.id.clone()),
            name: Some(group.name.clone()),
            owner_id: None,
        }
    }
}

/// An ingress rule as supplied by a caller to authorize or revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPermissionSpec {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub source_ips: Vec<String>,
    pub source_groups: Vec<UserGroupRef>,
}

impl IpPermissionSpec {
    /// A rule for the given protocol and port range with no sources yet.
    pub fn new(protocol: impl Into<String>, from_port: i32, to_port: i32) -> Self {
        Self {
            protocol: protocol.into(),
            from_port,
            to_port,
            ..Self::default()
        }
    }

    /// Add a CIDR source.
    pub fn with_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.source_ips.push(cidr.into());
        self
    }

    /// Add a source-group reference.
    pub fn with_group(mut self, group: UserGroupRef) -> Self {
        self.source_groups.push(group);
        self
    }

    /// Whether the rule names no sources at all.
    pub fn has_no_sources(&self) -> bool {
        self.source_ips.is_empty() && self.source_groups.is_empty()
    }
}

/// An ingress rule as listed back to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPermission {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub source_ips: Vec<String>,
    pub source_groups: Vec<UserGroup>,
}

/// Provider instance lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStateName {
    #[default]
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl InstanceStateName {
    /// All states, in code order.
    pub const ALL: [InstanceStateName; 6] = [
        InstanceStateName::Pending,
        InstanceStateName::Running,
        InstanceStateName::ShuttingDown,
        InstanceStateName::Terminated,
        InstanceStateName::Stopping,
        InstanceStateName::Stopped,
    ];

    /// Numeric state code reported by the provider.
    pub fn code(&self) -> i32 {
        match self {
            InstanceStateName::Pending => 0,
            InstanceStateName::Running => 16,
            InstanceStateName::ShuttingDown => 32,
            InstanceStateName::Terminated => 48,
            InstanceStateName::Stopping => 64,
            InstanceStateName::Stopped => 80,
        }
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStateName::Pending => "pending",
            InstanceStateName::Running => "running",
            InstanceStateName::ShuttingDown => "shutting-down",
            InstanceStateName::Terminated => "terminated",
            InstanceStateName::Stopping => "stopping",
            InstanceStateName::Stopped => "stopped",
        }
    }

    /// Whether an instance in this state still holds on to its groups.
    pub fn is_live(&self) -> bool {
        !matches!(
            self,
            InstanceStateName::ShuttingDown | InstanceStateName::Terminated
        )
    }
}

impl fmt::Display for InstanceStateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStateName {
    type Err = Ec2Error;

    fn from_str(s: &str) -> Ec2Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Ec2Error::invalid_parameter(format!("unknown instance state {:?}", s)))
    }
}

/// A simulated instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub reservation_id: ReservationId,
    pub owner_id: String,
    pub image_id: String,
    pub instance_type: String,
    /// Position of this instance within its launch batch.
    pub launch_index: u32,
    pub security_groups: Vec<GroupSummary>,
    /// Opaque payload, stored exactly as received.
    pub user_data: Vec<u8>,
    pub dns_name: String,
    pub state: InstanceStateName,
}

/// Launch parameters for [`run_instances`](crate::store::ResourceStore::run_instances).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInstancesParams {
    pub image_id: String,
    pub instance_type: Option<String>,
    pub min_count: Option<u32>,
    pub max_count: Option<u32>,
    pub security_groups: Vec<GroupRef>,
    pub user_data: Vec<u8>,
}

impl RunInstancesParams {
    /// Launch parameters for the given image.
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            ..Self::default()
        }
    }

    /// Set the instance type.
    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    /// Set the minimum count.
    pub fn with_min_count(mut self, count: u32) -> Self {
        self.min_count = Some(count);
        self
    }

    /// Set the maximum count.
    pub fn with_max_count(mut self, count: u32) -> Self {
        self.max_count = Some(count);
        self
    }

    /// Attach a security group.
    pub fn with_group(mut self, group: GroupRef) -> Self {
        self.security_groups.push(group);
        self
    }

    /// Set the user data payload.
    pub fn with_user_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.user_data = data.into();
        self
    }

    /// The number of instances to launch.
    ///
    /// A missing minimum means one, a missing maximum means the minimum.
    pub fn launch_count(&self) -> Ec2Result<u32> {
        let min = self.min_count.unwrap_or(1);
        let max = self.max_count.unwrap_or(min);
        if max < 1 {
            return Err(Ec2Error::invalid_parameter(format!(
                "MaxCount value {} must be at least 1",
                max
            )));
        }
        if min > max {
            return Err(Ec2Error::new(
                crate::error::ErrorCode::InvalidParameterCombination,
                format!("MinCount {} is greater than MaxCount {}", min, max),
            ));
        }
        Ok(max)
    }
}

/// The batch of instances created by one launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub owner_id: String,
    pub groups: Vec<GroupSummary>,
    pub instances: Vec<Instance>,
}

/// One instance's transition as reported by termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStateChange {
    pub instance: Instance,
    pub previous_state: InstanceStateName,
    pub current_state: InstanceStateName,
}
