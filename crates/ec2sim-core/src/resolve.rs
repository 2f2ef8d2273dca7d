//! Reference resolution.
//!
//! Pure lookups over the store's tables: a partially populated reference goes
//! in, the canonical stored entity (or a `NotFound`) comes out.

use std::collections::BTreeMap;

use crate::error::{Ec2Error, Ec2Result};
use crate::ids::{GroupId, InstanceId};
use crate::model::{GroupRef, Instance, SecurityGroup, UserGroup, UserGroupRef};

/// Resolve a group reference to the stored group.
///
/// When both id and name are given they must name the same group.
pub fn resolve_group<'a>(
    groups: &'a BTreeMap<GroupId, SecurityGroup>,
    group: &GroupRef,
) -> Ec2Result<&'a SecurityGroup> {
    match (&group.id, &group.name) {
        (Some(id), name) => {
            let found = groups.get(id).ok_or_else(|| {
                Ec2Error::group_not_found(format!("The security group ID '{}' does not exist", id))
            })?;
            match name {
                Some(name) if name != &found.name => Err(Ec2Error::group_not_found(format!(
                    "The security group ID '{}' does not have the name '{}'",
                    id, name
                ))),
                _ => Ok(found),
            }
        }
        (None, Some(name)) => find_by_name(groups, name).ok_or_else(|| {
            Ec2Error::group_not_found(format!("The security group '{}' does not exist", name))
        }),
        (None, None) => Err(Ec2Error::invalid_parameter(
            "a security group must be referenced by id or name",
        )),
    }
}

/// Resolve a source-group reference to its canonical triple.
///
/// A reference naming an owner other than `owner_id` cannot match.
pub fn resolve_source_group(
    groups: &BTreeMap<GroupId, SecurityGroup>,
    owner_id: &str,
    source: &UserGroupRef,
) -> Ec2Result<UserGroup> {
    if let Some(owner) = source.owner_id.as_deref().filter(|owner| *owner != owner_id) {
        return Err(Ec2Error::group_not_found(format!(
            "The security group '{}' owned by '{}' does not exist",
            source.group_ref(),
            owner
        )));
    }
    resolve_group(groups, &source.group_ref()).map(SecurityGroup::as_user_group)
}

/// Find a group by its unique name.
pub fn find_by_name<'a>(
    groups: &'a BTreeMap<GroupId, SecurityGroup>,
    name: &str,
) -> Option<&'a SecurityGroup> {
    groups.values().find(|g| g.name == name)
}

/// Resolve a list of instance ids, failing on the first one absent.
pub fn resolve_instances<'a>(
    instances: &'a BTreeMap<InstanceId, Instance>,
    ids: &[InstanceId],
) -> Ec2Result<Vec<&'a Instance>> {
    ids.iter()
        .map(|id| {
            instances
                .get(id)
                .ok_or_else(|| Ec2Error::instance_not_found(id.as_str()))
        })
        .collect()
}
