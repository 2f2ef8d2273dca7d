//! Ingress permission sets.
//!
//! A group's rules are bucketed by `(protocol, from_port, to_port)`. Rules
//! sharing a bucket are one logical rule whose source sets get unioned on
//! authorize and subtracted on revoke. A bucket left without sources is
//! dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::config::RevokePolicy;
use crate::error::{Ec2Error, Ec2Result, ErrorCode};
use crate::ids::GroupId;
use crate::model::{IpPermission, IpPermissionSpec, UserGroup};

/// Identity of a rule for merge and removal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}-{}", self.protocol, self.from_port, self.to_port)
    }
}

/// The sources authorized under one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSources {
    pub ips: BTreeSet<String>,
    pub groups: BTreeSet<UserGroup>,
}

impl PermissionSources {
    pub fn is_empty(&self) -> bool {
        self.ips.is_empty() && self.groups.is_empty()
    }

    /// Whether every source in `other` is already present here.
    pub fn covers(&self, other: &PermissionSources) -> bool {
        other.ips.is_subset(&self.ips) && other.groups.is_subset(&self.groups)
    }

    fn absorb(&mut self, other: &PermissionSources) {
        self.ips.extend(other.ips.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
    }

    fn subtract(&mut self, other: &PermissionSources) {
        self.ips.retain(|ip| !other.ips.contains(ip));
        self.groups.retain(|g| !other.groups.contains(g));
    }

    fn first_missing(&self, other: &PermissionSources) -> Option<String> {
        other
            .ips
            .iter()
            .find(|ip| !self.ips.contains(*ip))
            .cloned()
            .or_else(|| {
                other
                    .groups
                    .iter()
                    .find(|g| !self.groups.contains(*g))
                    .map(|g| g.id.to_string())
            })
    }
}

/// An incoming rule after validation and source-group canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPermission {
    pub key: PermissionKey,
    pub sources: PermissionSources,
}

/// The rule set of one security group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    rules: BTreeMap<PermissionKey, PermissionSources>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over buckets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PermissionKey, &PermissionSources)> {
        self.rules.iter()
    }

    /// Sources authorized under a bucket, if any.
    pub fn sources(&self, key: &PermissionKey) -> Option<&PermissionSources> {
        self.rules.get(key)
    }

    /// Whether any bucket names `group` as a source.
    pub fn references_group(&self, group: &GroupId) -> bool {
        self.rules
            .values()
            .any(|sources| sources.groups.iter().any(|g| &g.id == group))
    }

    /// Listing form of every bucket, sources sorted.
    pub fn to_ip_permissions(&self) -> Vec<IpPermission> {
        self.rules
            .iter()
            .map(|(key, sources)| IpPermission {
                protocol: key.protocol.clone(),
                from_port: key.from_port,
                to_port: key.to_port,
                source_ips: sources.ips.iter().cloned().collect(),
                source_groups: sources.groups.iter().cloned().collect(),
            })
            .collect()
    }

    /// Union the given rules in.
    ///
    /// Fails `InvalidPermission.Duplicate` without touching the set when any
    /// rule's sources are already fully covered by its bucket. Rules with no
    /// sources are ignored.
    pub fn authorize(&mut self, perms: &[ResolvedPermission]) -> Ec2Result<()> {
        for perm in perms.iter().filter(|p| !p.sources.is_empty()) {
            let covered = self
                .rules
                .get(&perm.key)
                .is_some_and(|existing| existing.covers(&perm.sources));
            if covered {
                return Err(Ec2Error::new(
                    ErrorCode::PermissionDuplicate,
                    format!(
                        "the specified rule \"peer: {}, {}, ALLOW\" already exists",
                        describe_sources(&perm.sources),
                        perm.key
                    ),
                ));
            }
        }

        for perm in perms.iter().filter(|p| !p.sources.is_empty()) {
            self.rules
                .entry(perm.key.clone())
                .or_default()
                .absorb(&perm.sources);
        }
        Ok(())
    }

    /// Subtract the given rules' sources.
    ///
    /// Under [`RevokePolicy::Strict`] a source missing from its bucket fails
    /// `InvalidPermission.NotFound` without touching the set.
    pub fn revoke(&mut self, perms: &[ResolvedPermission], policy: RevokePolicy) -> Ec2Result<()> {
        if policy == RevokePolicy::Strict {
            for perm in perms {
                let missing = match self.rules.get(&perm.key) {
                    Some(existing) => existing.first_missing(&perm.sources),
                    None if perm.sources.is_empty() => None,
                    None => Some(perm.key.to_string()),
                };
                if let Some(missing) = missing {
                    return Err(Ec2Error::new(
                        ErrorCode::PermissionNotFound,
                        format!(
                            "the specified rule does not exist in this security group: {} from {}",
                            perm.key, missing
                        ),
                    ));
                }
            }
        }

        for perm in perms {
            if let Some(existing) = self.rules.get_mut(&perm.key) {
                existing.subtract(&perm.sources);
                if existing.is_empty() {
                    self.rules.remove(&perm.key);
                }
            }
        }
        Ok(())
    }
}

fn describe_sources(sources: &PermissionSources) -> String {
    sources
        .ips
        .iter()
        .cloned()
        .chain(sources.groups.iter().map(|g| g.id.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Validate and normalize a rule's protocol and ports.
///
/// Returns the bucket key the rule belongs to.
pub fn validate_key(spec: &IpPermissionSpec) -> Ec2Result<PermissionKey> {
    let protocol = spec.protocol.trim().to_ascii_lowercase();
    match protocol.as_str() {
        "tcp" | "udp" => {
            if spec.from_port > spec.to_port {
                return Err(Ec2Error::invalid_parameter(format!(
                    "invalid port range {}-{}: from port is greater than to port",
                    spec.from_port, spec.to_port
                )));
            }
        }
        "icmp" => {}
        other if other.parse::<i32>().is_ok() => {}
        other => {
            return Err(Ec2Error::invalid_parameter(format!(
                "invalid IP protocol {:?}",
                other
            )));
        }
    }
    Ok(PermissionKey {
        protocol,
        from_port: spec.from_port,
        to_port: spec.to_port,
    })
}

/// Validate a CIDR block: dotted-quad IPv4 with a `/0..32` prefix.
pub fn validate_cidr(cidr: &str) -> Ec2Result<()> {
    let malformed = || {
        Ec2Error::new(
            ErrorCode::PermissionMalformed,
            format!("CIDR block {} is malformed", cidr),
        )
    };
    let (addr, prefix) = cidr.split_once('/').ok_or_else(malformed)?;
    addr.parse::<Ipv4Addr>().map_err(|_| malformed())?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    match prefix.parse::<u8>() {
        Ok(bits) if bits <= 32 => Ok(()),
        _ => Err(malformed()),
    }
}
