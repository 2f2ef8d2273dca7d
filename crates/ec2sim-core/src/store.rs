//! The in-memory resource store.
//!
//! [`ResourceStore`] owns every simulated group and instance behind a single
//! `RwLock`. Each mutation validates its whole input against the current
//! state before touching anything, under one write guard, so a failed call
//! leaves the store exactly as it found it and readers never observe a
//! half-applied change.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Ec2Error, Ec2Result, ErrorCode};
use crate::ids::{GroupId, IdAllocator, InstanceId};
use crate::model::{
    DEFAULT_INSTANCE_TYPE, GroupRef, GroupSummary, Instance, InstanceStateChange,
    InstanceStateName, IpPermissionSpec, Reservation, RunInstancesParams, SecurityGroup,
};
use crate::permission::{
    PermissionKey, PermissionSet, PermissionSources, ResolvedPermission, validate_cidr,
    validate_key,
};
use crate::resolve::{find_by_name, resolve_group, resolve_instances, resolve_source_group};

/// Decides whether a candidate belongs in a listing.
pub trait Matcher<T>: Send + Sync {
    /// Whether `candidate` matches.
    fn matches(&self, candidate: &T) -> bool;
}

/// A matcher that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl<T> Matcher<T> for MatchAll {
    fn matches(&self, _candidate: &T) -> bool {
        true
    }
}

/// Adapts a closure into a [`Matcher`].
#[derive(Debug, Clone, Copy)]
pub struct MatchWith<F>(pub F);

impl<T, F> Matcher<T> for MatchWith<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn matches(&self, candidate: &T) -> bool {
        (self.0)(candidate)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    groups: BTreeMap<GroupId, SecurityGroup>,
    instances: BTreeMap<InstanceId, Instance>,
}

/// The simulated provider's resource store.
///
/// # Example
///
/// ```
/// use ec2sim_core::prelude::*;
///
/// let store = ResourceStore::new(StoreConfig::empty());
/// let web = store.create_group("web", "web tier").unwrap();
/// store
///     .authorize_ingress(
///         &GroupRef::by_id(web.id.clone()),
///         &[IpPermissionSpec::new("tcp", 80, 80).with_cidr("0.0.0.0/0")],
///     )
///     .unwrap();
///
/// let listed = store.list_groups(&[], &MatchAll).unwrap();
/// assert_eq!(listed.len(), 1);
/// ```
pub struct ResourceStore {
    config: StoreConfig,
    ids: IdAllocator,
    state: RwLock<StoreState>,
}

impl ResourceStore {
    /// Create a store, seeding the default group when configured.
    pub fn new(config: StoreConfig) -> Self {
        let store = Self {
            config,
            ids: IdAllocator::new(),
            state: RwLock::new(StoreState::default()),
        };
        {
            let mut state = store.state.write();
            store.seed(&mut state);
        }
        info!(
            owner_id = %store.config.owner_id,
            default_group = store.config.default_group,
            "Created resource store"
        );
        store
    }

    /// Create a store with the default configuration.
    pub fn default_store() -> Self {
        Self::new(StoreConfig::default())
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.state.read().groups.len()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.state.read().instances.len()
    }

    /// Create a security group.
    pub fn create_group(&self, name: &str, description: &str) -> Ec2Result<SecurityGroup> {
        if name.is_empty() {
            return Err(Ec2Error::invalid_parameter("GroupName must not be empty"));
        }
        let mut state = self.state.write();
        if find_by_name(&state.groups, name).is_some() {
            return Err(Ec2Error::new(
                ErrorCode::GroupDuplicate,
                format!("The security group '{}' already exists", name),
            ));
        }
        let group = self.insert_group(&mut state, name, description);
        info!(group_id = %group.id, group_name = %group.name, "Created security group");
        Ok(group)
    }

    /// Delete a security group.
    ///
    /// Fails `InvalidGroup.InUse` while any other group's permissions name it
    /// as a source. A group referencing only itself can be deleted.
    pub fn delete_group(&self, group: &GroupRef) -> Ec2Result<SecurityGroup> {
        let mut state = self.state.write();
        let target = resolve_group(&state.groups, group)?.id.clone();

        let users: Vec<&GroupId> = state
            .groups
            .values()
            .filter(|g| g.id != target && g.permissions.references_group(&target))
            .map(|g| &g.id)
            .collect();
        if !users.is_empty() {
            return Err(Ec2Error::new(
                ErrorCode::GroupInUse,
                format!(
                    "group {} is used by groups: {}",
                    target,
                    users.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
                ),
            ));
        }

        if self.config.protect_groups_used_by_instances {
            let holder = state.instances.values().find(|inst| {
                inst.state.is_live() && inst.security_groups.iter().any(|g| g.id == target)
            });
            if let Some(holder) = holder {
                return Err(Ec2Error::new(
                    ErrorCode::GroupInUse,
                    format!("group {} is used by instance {}", target, holder.id),
                ));
            }
        }

        let removed = state
            .groups
            .remove(&target)
            .unwrap_or_else(|| panic!("resolved group {} vanished under write lock", target));
        info!(group_id = %removed.id, group_name = %removed.name, "Deleted security group");
        Ok(removed)
    }

    /// Look up one group.
    pub fn group(&self, group: &GroupRef) -> Ec2Result<SecurityGroup> {
        let state = self.state.read();
        resolve_group(&state.groups, group).cloned()
    }

    /// List groups.
    ///
    /// With `refs`, every reference must resolve or the whole call fails;
    /// otherwise all groups are candidates. Candidates are then narrowed by
    /// `filter`.
    pub fn list_groups(
        &self,
        refs: &[GroupRef],
        filter: &dyn Matcher<SecurityGroup>,
    ) -> Ec2Result<Vec<SecurityGroup>> {
        let state = self.state.read();
        let candidates: Vec<&SecurityGroup> = if refs.is_empty() {
            state.groups.values().collect()
        } else {
            let mut seen = BTreeSet::new();
            let mut picked = Vec::with_capacity(refs.len());
            for group_ref in refs {
                let group = resolve_group(&state.groups, group_ref)?;
                if seen.insert(&group.id) {
                    picked.push(group);
                }
            }
            picked
        };

        let matched: Vec<SecurityGroup> = candidates
            .into_iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        debug!(refs = refs.len(), matched = matched.len(), "Listed security groups");
        Ok(matched)
    }

    /// Authorize ingress rules on a group.
    pub fn authorize_ingress(
        &self,
        group: &GroupRef,
        perms: &[IpPermissionSpec],
    ) -> Ec2Result<SecurityGroup> {
        let mut state = self.state.write();
        let target = resolve_group(&state.groups, group)?.id.clone();
        let resolved = self.resolve_permissions(&state, perms)?;

        let entry = state
            .groups
            .get_mut(&target)
            .unwrap_or_else(|| panic!("resolved group {} vanished under write lock", target));
        entry.permissions.authorize(&resolved)?;
        info!(group_id = %target, rules = resolved.len(), "Authorized ingress");
        Ok(entry.clone())
    }

    /// Revoke ingress rules from a group.
    pub fn revoke_ingress(
        &self,
        group: &GroupRef,
        perms: &[IpPermissionSpec],
    ) -> Ec2Result<SecurityGroup> {
        let mut state = self.state.write();
        let target = resolve_group(&state.groups, group)?.id.clone();
        let resolved = self.resolve_permissions(&state, perms)?;

        let policy = self.config.revoke_policy;
        let entry = state
            .groups
            .get_mut(&target)
            .unwrap_or_else(|| panic!("resolved group {} vanished under write lock", target));
        entry.permissions.revoke(&resolved, policy)?;
        info!(group_id = %target, rules = resolved.len(), "Revoked ingress");
        Ok(entry.clone())
    }

    /// Launch a batch of instances sharing one reservation.
    pub fn run_instances(&self, params: &RunInstancesParams) -> Ec2Result<Reservation> {
        if params.image_id.is_empty() {
            return Err(Ec2Error::invalid_parameter("ImageId must be specified"));
        }
        let count = params.launch_count()?;
        let limit = self.config.max_instances_per_launch;
        if count > limit {
            return Err(Ec2Error::new(
                ErrorCode::InstanceLimitExceeded,
                format!(
                    "launching {} instances would exceed the limit of {} per request",
                    count, limit
                ),
            ));
        }
        let instance_type = params
            .instance_type
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string());

        let mut state = self.state.write();
        let mut groups: Vec<GroupSummary> = Vec::with_capacity(params.security_groups.len());
        for group_ref in &params.security_groups {
            let summary = resolve_group(&state.groups, group_ref)?.summary();
            if !groups.contains(&summary) {
                groups.push(summary);
            }
        }

        let reservation_id = self.ids.next_reservation();
        let mut instances = Vec::with_capacity(count as usize);
        for launch_index in 0..count {
            let id = self.ids.next_instance();
            let instance = Instance {
                dns_name: format!("{}.{}", id, self.config.dns_suffix),
                id: id.clone(),
                reservation_id: reservation_id.clone(),
                owner_id: self.config.owner_id.clone(),
                image_id: params.image_id.clone(),
                instance_type: instance_type.clone(),
                launch_index,
                security_groups: groups.clone(),
                user_data: params.user_data.clone(),
                state: self.config.initial_instance_state,
            };
            if state.instances.insert(id.clone(), instance.clone()).is_some() {
                panic!("instance id {} allocated twice", id);
            }
            instances.push(instance);
        }

        info!(
            reservation_id = %reservation_id,
            image_id = %params.image_id,
            count = count,
            "Launched instances"
        );
        Ok(Reservation {
            id: reservation_id,
            owner_id: self.config.owner_id.clone(),
            groups,
            instances,
        })
    }

    /// Terminate instances, all or nothing.
    ///
    /// Fails `InvalidInstanceID.NotFound` naming the first unknown id.
    /// Repeated ids are reported once.
    pub fn terminate_instances(&self, ids: &[InstanceId]) -> Ec2Result<Vec<InstanceStateChange>> {
        let mut state = self.state.write();
        resolve_instances(&state.instances, ids)?;

        let mut seen = BTreeSet::new();
        let mut changes = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            let mut instance = state
                .instances
                .remove(id)
                .unwrap_or_else(|| panic!("resolved instance {} vanished under write lock", id));
            let previous_state = instance.state;
            instance.state = InstanceStateName::Terminated;
            changes.push(InstanceStateChange {
                instance,
                previous_state,
                current_state: InstanceStateName::Terminated,
            });
        }
        info!(count = changes.len(), "Terminated instances");
        Ok(changes)
    }

    /// List instances.
    ///
    /// With `ids`, every id must resolve or the whole call fails; otherwise
    /// all instances are candidates. Candidates are then narrowed by `filter`.
    pub fn list_instances(
        &self,
        ids: &[InstanceId],
        filter: &dyn Matcher<Instance>,
    ) -> Ec2Result<Vec<Instance>> {
        let state = self.state.read();
        let candidates: Vec<&Instance> = if ids.is_empty() {
            state.instances.values().collect()
        } else {
            let mut seen = BTreeSet::new();
            resolve_instances(&state.instances, ids)?
                .into_iter()
                .filter(|inst| seen.insert(&inst.id))
                .collect()
        };

        let matched: Vec<Instance> = candidates
            .into_iter()
            .filter(|inst| filter.matches(inst))
            .cloned()
            .collect();
        debug!(ids = ids.len(), matched = matched.len(), "Listed instances");
        Ok(matched)
    }

    /// Inspect a stored instance, including its verbatim user data.
    pub fn instance(&self, id: &InstanceId) -> Option<Instance> {
        self.state.read().instances.get(id).cloned()
    }

    /// Move an instance to another state, returning the state it left.
    pub fn set_instance_state(
        &self,
        id: &InstanceId,
        new_state: InstanceStateName,
    ) -> Ec2Result<InstanceStateName> {
        let mut state = self.state.write();
        let instance = state
            .instances
            .get_mut(id)
            .ok_or_else(|| Ec2Error::instance_not_found(id.as_str()))?;
        let previous = std::mem::replace(&mut instance.state, new_state);
        debug!(instance_id = %id, from = %previous, to = %new_state, "Changed instance state");
        Ok(previous)
    }

    /// Drop every entity and start over.
    ///
    /// Id counters keep counting, so ids are never reused.
    pub fn reset(&self) {
        let mut state = self.state.write();
        *state = StoreState::default();
        self.seed(&mut state);
        info!("Reset resource store");
    }

    fn seed(&self, state: &mut StoreState) {
        if !self.config.default_group {
            return;
        }
        let group = self.insert_group(state, "default", "default group");
        let itself = group.as_user_group();
        let rules: Vec<ResolvedPermission> = [("icmp", -1, -1), ("tcp", 0, 65535), ("udp", 0, 65535)]
            .into_iter()
            .map(|(protocol, from_port, to_port)| ResolvedPermission {
                key: PermissionKey {
                    protocol: protocol.to_string(),
                    from_port,
                    to_port,
                },
                sources: PermissionSources {
                    ips: BTreeSet::new(),
                    groups: BTreeSet::from([itself.clone()]),
                },
            })
            .collect();

        let mut permissions = PermissionSet::new();
        if let Err(err) = permissions.authorize(&rules) {
            panic!("default group rules rejected: {}", err);
        }
        if let Some(entry) = state.groups.get_mut(&group.id) {
            entry.permissions = permissions;
        }
        debug!(group_id = %group.id, "Seeded default group");
    }

    fn insert_group(&self, state: &mut StoreState, name: &str, description: &str) -> SecurityGroup {
        let group = SecurityGroup {
            id: self.ids.next_group(),
            name: name.to_string(),
            description: description.to_string(),
            owner_id: self.config.owner_id.clone(),
            permissions: PermissionSet::new(),
        };
        if state.groups.insert(group.id.clone(), group.clone()).is_some() {
            panic!("group id {} allocated twice", group.id);
        }
        group
    }

    fn resolve_permissions(
        &self,
        state: &StoreState,
        perms: &[IpPermissionSpec],
    ) -> Ec2Result<Vec<ResolvedPermission>> {
        let mut resolved = Vec::with_capacity(perms.len());
        for spec in perms {
            let key = validate_key(spec)?;
            if spec.has_no_sources() {
                debug!(rule = %key, "Ignoring rule without sources");
                continue;
            }
            let mut sources = PermissionSources::default();
            for cidr in &spec.source_ips {
                validate_cidr(cidr)?;
                sources.ips.insert(cidr.clone());
            }
            for source in &spec.source_groups {
                sources.groups.insert(resolve_source_group(
                    &state.groups,
                    &self.config.owner_id,
                    source,
                )?);
            }
            resolved.push(ResolvedPermission { key, sources });
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ResourceStore")
            .field("config", &self.config)
            .field("groups", &state.groups.len())
            .field("instances", &state.instances.len())
            .finish()
    }
}

/// A shared reference to a resource store.
pub type SharedStore = Arc<ResourceStore>;

/// Extension trait for converting a store into a shared reference.
pub trait IntoShared {
    /// Convert into a shared reference.
    fn into_shared(self) -> SharedStore;
}

impl IntoShared for ResourceStore {
    fn into_shared(self) -> SharedStore {
        Arc::new(self)
    }
}
