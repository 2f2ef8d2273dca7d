//! Filter attributes of security groups.

use ec2sim_core::SecurityGroup;

use crate::attribute::{Attribute, FilterValue, ValueKind};

/// Predicates accepted when listing security groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAttribute {
    /// `description`: exact description.
    Description,
    /// `group-id`
    GroupId,
    /// `group-name`
    GroupName,
    /// `owner-id`
    OwnerId,
    /// `ip-permission.cidr`: any rule authorizes this CIDR.
    PermissionCidr,
    /// `ip-permission.group-id`: any rule authorizes this source group id.
    PermissionGroupId,
    /// `ip-permission.group-name`: any rule authorizes this source group name.
    PermissionGroupName,
    /// `ip-permission.protocol`
    PermissionProtocol,
    /// `ip-permission.from-port`, compared numerically rather than as a
    /// decimal string: `080` matches port 80 and `abc` fails compilation.
    PermissionFromPort,
    /// `ip-permission.to-port`, compared numerically like `from-port`.
    PermissionToPort,
}

impl Attribute for GroupAttribute {
    type Target = SecurityGroup;
    const KIND: &'static str = "security groups";

    fn all() -> &'static [Self] {
        &[
            GroupAttribute::Description,
            GroupAttribute::GroupId,
            GroupAttribute::GroupName,
            GroupAttribute::OwnerId,
            GroupAttribute::PermissionCidr,
            GroupAttribute::PermissionGroupId,
            GroupAttribute::PermissionGroupName,
            GroupAttribute::PermissionProtocol,
            GroupAttribute::PermissionFromPort,
            GroupAttribute::PermissionToPort,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            GroupAttribute::Description => "description",
            GroupAttribute::GroupId => "group-id",
            GroupAttribute::GroupName => "group-name",
            GroupAttribute::OwnerId => "owner-id",
            GroupAttribute::PermissionCidr => "ip-permission.cidr",
            GroupAttribute::PermissionGroupId => "ip-permission.group-id",
            GroupAttribute::PermissionGroupName => "ip-permission.group-name",
            GroupAttribute::PermissionProtocol => "ip-permission.protocol",
            GroupAttribute::PermissionFromPort => "ip-permission.from-port",
            GroupAttribute::PermissionToPort => "ip-permission.to-port",
        }
    }

    fn value_kind(&self) -> ValueKind {
        match self {
            GroupAttribute::PermissionFromPort | GroupAttribute::PermissionToPort => {
                ValueKind::Integer
            }
            _ => ValueKind::Text,
        }
    }

    fn matches(&self, group: &SecurityGroup, value: &FilterValue) -> bool {
        let mut rules = group.permissions.iter();
        match self {
            GroupAttribute::Description => value.is_text(&group.description),
            GroupAttribute::GroupId => value.is_text(group.id.as_str()),
            GroupAttribute::GroupName => value.is_text(&group.name),
            GroupAttribute::OwnerId => value.is_text(&group.owner_id),
            GroupAttribute::PermissionCidr => {
                rules.any(|(_, sources)| sources.ips.iter().any(|ip| value.is_text(ip)))
            }
            GroupAttribute::PermissionGroupId => rules.any(|(_, sources)| {
                sources.groups.iter().any(|g| value.is_text(g.id.as_str()))
            }),
            GroupAttribute::PermissionGroupName => {
                rules.any(|(_, sources)| sources.groups.iter().any(|g| value.is_text(&g.name)))
            }
            GroupAttribute::PermissionProtocol => rules.any(|(key, _)| value.is_text(&key.protocol)),
            GroupAttribute::PermissionFromPort => {
                rules.any(|(key, _)| value.is_integer(i64::from(key.from_port)))
            }
            GroupAttribute::PermissionToPort => {
                rules.any(|(key, _)| value.is_integer(i64::from(key.to_port)))
            }
        }
    }
}
