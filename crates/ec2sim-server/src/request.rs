//! Decoding of query-protocol requests into typed operations.
//!
//! Decoding is the validation stage of a request: everything that can be
//! checked without looking at the store is checked here, so a request that
//! fails to decode never reaches the engine.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use ec2sim_core::{
    Ec2Error, Ec2Result, ErrorCode, GroupId, GroupRef, InstanceId, IpPermissionSpec,
    RunInstancesParams, UserGroupRef,
};
use ec2sim_filter::Filter;

use crate::params::{IndexedEntries, QueryParams, parse_integer, split_indexed, unknown_parameter};

/// Operations the endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    CreateSecurityGroup,
    DeleteSecurityGroup,
    DescribeSecurityGroups,
    AuthorizeSecurityGroupIngress,
    RevokeSecurityGroupIngress,
    RunInstances,
    TerminateInstances,
    DescribeInstances,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::CreateSecurityGroup,
        Action::DeleteSecurityGroup,
        Action::DescribeSecurityGroups,
        Action::AuthorizeSecurityGroupIngress,
        Action::RevokeSecurityGroupIngress,
        Action::RunInstances,
        Action::TerminateInstances,
        Action::DescribeInstances,
    ];

    /// The wire name, as sent in the `Action` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateSecurityGroup => "CreateSecurityGroup",
            Action::DeleteSecurityGroup => "DeleteSecurityGroup",
            Action::DescribeSecurityGroups => "DescribeSecurityGroups",
            Action::AuthorizeSecurityGroupIngress => "AuthorizeSecurityGroupIngress",
            Action::RevokeSecurityGroupIngress => "RevokeSecurityGroupIngress",
            Action::RunInstances => "RunInstances",
            Action::TerminateInstances => "TerminateInstances",
            Action::DescribeInstances => "DescribeInstances",
        }
    }

    /// Name of the XML response root element.
    pub fn response_root(&self) -> String {
        format!("{}Response", self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Ec2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(unrecognized_action)
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ec2Request {
    CreateSecurityGroup {
        name: String,
        description: String,
    },
    DeleteSecurityGroup {
        group: GroupRef,
    },
    DescribeSecurityGroups {
        groups: Vec<GroupRef>,
        filter: Filter,
    },
    AuthorizeSecurityGroupIngress {
        group: GroupRef,
        permissions: Vec<IpPermissionSpec>,
    },
    RevokeSecurityGroupIngress {
        group: GroupRef,
        permissions: Vec<IpPermissionSpec>,
    },
    RunInstances(RunInstancesParams),
    TerminateInstances {
        instance_ids: Vec<InstanceId>,
    },
    DescribeInstances {
        instance_ids: Vec<InstanceId>,
        filter: Filter,
    },
}

impl Ec2Request {
    /// Decode and validate a request from its parameters.
    pub fn decode(params: &QueryParams) -> Ec2Result<Self> {
        let action: Action = params
            .get("Action")
            .ok_or_else(unrecognized_action)?
            .parse()?;

        let request = match action {
            Action::CreateSecurityGroup => Ec2Request::CreateSecurityGroup {
                name: params.require("GroupName")?.to_string(),
                description: params.require("GroupDescription")?.to_string(),
            },
            Action::DeleteSecurityGroup => Ec2Request::DeleteSecurityGroup {
                group: target_group(params)?,
            },
            Action::DescribeSecurityGroups => {
                let mut groups: Vec<GroupRef> = params
                    .list("GroupId")?
                    .into_iter()
                    .map(GroupRef::by_id)
                    .collect();
                groups.extend(params.list("GroupName")?.into_iter().map(GroupRef::by_name));
                Ec2Request::DescribeSecurityGroups {
                    groups,
                    filter: params.filter()?,
                }
            }
            Action::AuthorizeSecurityGroupIngress => Ec2Request::AuthorizeSecurityGroupIngress {
                group: target_group(params)?,
                permissions: ip_permissions(params)?,
            },
            Action::RevokeSecurityGroupIngress => Ec2Request::RevokeSecurityGroupIngress {
                group: target_group(params)?,
                permissions: ip_permissions(params)?,
            },
            Action::RunInstances => Ec2Request::RunInstances(run_params(params)?),
            Action::TerminateInstances => {
                let instance_ids = instance_ids(params)?;
                if instance_ids.is_empty() {
                    return Err(Ec2Error::invalid_parameter(
                        "at least one InstanceId is required",
                    ));
                }
                Ec2Request::TerminateInstances { instance_ids }
            }
            Action::DescribeInstances => Ec2Request::DescribeInstances {
                instance_ids: instance_ids(params)?,
                filter: params.filter()?,
            },
        };
        Ok(request)
    }

    /// The operation this request invokes.
    pub fn action(&self) -> Action {
        match self {
            Ec2Request::CreateSecurityGroup { .. } => Action::CreateSecurityGroup,
            Ec2Request::DeleteSecurityGroup { .. } => Action::DeleteSecurityGroup,
            Ec2Request::DescribeSecurityGroups { .. } => Action::DescribeSecurityGroups,
            Ec2Request::AuthorizeSecurityGroupIngress { .. } => {
                Action::AuthorizeSecurityGroupIngress
            }
            Ec2Request::RevokeSecurityGroupIngress { .. } => Action::RevokeSecurityGroupIngress,
            Ec2Request::RunInstances(_) => Action::RunInstances,
            Ec2Request::TerminateInstances { .. } => Action::TerminateInstances,
            Ec2Request::DescribeInstances { .. } => Action::DescribeInstances,
        }
    }
}

fn unrecognized_action() -> Ec2Error {
    Ec2Error::invalid_parameter("Unrecognized Action")
}

/// The group an action operates on, from `GroupId` and/or `GroupName`.
fn target_group(params: &QueryParams) -> Ec2Result<GroupRef> {
    let group = GroupRef {
        id: params.get("GroupId").map(GroupId::new),
        name: params.get("GroupName").map(str::to_string),
    };
    if group.is_empty() {
        return Err(Ec2Error::invalid_parameter(
            "either GroupId or GroupName must be given",
        ));
    }
    Ok(group)
}

fn instance_ids(params: &QueryParams) -> Ec2Result<Vec<InstanceId>> {
    Ok(params
        .list("InstanceId")?
        .into_iter()
        .map(InstanceId::new)
        .collect())
}

fn run_params(params: &QueryParams) -> Ec2Result<RunInstancesParams> {
    let image_id = params.require("ImageId")?;
    if image_id.is_empty() {
        return Err(Ec2Error::invalid_parameter("ImageId must not be empty"));
    }
    let mut run = RunInstancesParams::new(image_id);
    run.instance_type = params.get("InstanceType").map(str::to_string);
    run.min_count = params.integer("MinCount")?;
    run.max_count = params.integer("MaxCount")?;
    run.security_groups = params
        .list("SecurityGroupId")?
        .into_iter()
        .map(GroupRef::by_id)
        .chain(params.list("SecurityGroup")?.into_iter().map(GroupRef::by_name))
        .collect();
    if let Some(encoded) = params.get("UserData") {
        run.user_data = STANDARD.decode(encoded.trim()).map_err(|err| {
            Ec2Error::invalid_parameter(format!("UserData is not valid base64: {}", err))
        })?;
    }
    // Counts are checked here so a bad combination never reaches the store.
    run.launch_count()?;
    Ok(run)
}

/// Decode every `IpPermissions.N` rule.
fn ip_permissions(params: &QueryParams) -> Ec2Result<Vec<IpPermissionSpec>> {
    params
        .indexed("IpPermissions")?
        .into_iter()
        .map(|(index, entries)| ip_permission(index, &entries))
        .collect()
}

fn ip_permission(index: u64, entries: &IndexedEntries<'_>) -> Ec2Result<IpPermissionSpec> {
    let key = |rest: &str| format!("IpPermissions.{}.{}", index, rest);

    let mut protocol = None;
    let mut from_port = None;
    let mut to_port = None;
    let mut group_entries = Vec::new();
    let mut range_entries = Vec::new();
    for &(rest, value) in entries {
        match rest {
            "IpProtocol" => protocol = Some(value),
            "FromPort" => from_port = Some(parse_integer::<i32>(&key(rest), value)?),
            "ToPort" => to_port = Some(parse_integer::<i32>(&key(rest), value)?),
            _ if rest.starts_with("Groups.") => group_entries.push((rest, value)),
            _ if rest.starts_with("IpRanges.") => range_entries.push((rest, value)),
            _ => return Err(unknown_parameter(&key(rest))),
        }
    }

    let protocol = protocol.ok_or_else(|| {
        Ec2Error::invalid_parameter(format!("{} is required", key("IpProtocol")))
    })?;
    // All-traffic rules carry no port range.
    let default_port = (protocol.trim() == "-1").then_some(-1);
    let missing_port = |name: &str| {
        Ec2Error::invalid_parameter(format!("{} is required", key(name)))
    };
    let from_port = from_port
        .or(default_port)
        .ok_or_else(|| missing_port("FromPort"))?;
    let to_port = to_port
        .or(default_port)
        .ok_or_else(|| missing_port("ToPort"))?;

    let mut spec = IpPermissionSpec::new(protocol, from_port, to_port);
    for (n, group) in split_indexed(&group_entries, "Groups")? {
        spec.source_groups
            .push(source_group(&key(&format!("Groups.{}", n)), &group)?);
    }
    for (n, range) in split_indexed(&range_entries, "IpRanges")? {
        for (field, value) in range {
            if field != "CidrIp" {
                return Err(unknown_parameter(&key(&format!("IpRanges.{}.{}", n, field))));
            }
            spec.source_ips.push(value.to_string());
        }
    }
    Ok(spec)
}

fn source_group(prefix: &str, entries: &IndexedEntries<'_>) -> Ec2Result<UserGroupRef> {
    let mut group = UserGroupRef::default();
    for &(field, value) in entries {
        match field {
            "GroupId" => {
                if !is_group_id(value) {
                    return Err(Ec2Error::new(
                        ErrorCode::GroupIdMalformed,
                        format!("Invalid id: {:?}", value),
                    ));
                }
                group.id = Some(GroupId::new(value));
            }
            "GroupName" => group.name = Some(value.to_string()),
            "UserId" => {
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Ec2Error::new(
                        ErrorCode::UserIdMalformed,
                        format!("Invalid user ID: {:?}", value),
                    ));
                }
                group.owner_id = Some(value.to_string());
            }
            _ => return Err(unknown_parameter(&format!("{}.{}", prefix, field))),
        }
    }
    if group.id.is_none() && group.name.is_none() {
        return Err(Ec2Error::invalid_parameter(format!(
            "{} names neither GroupId nor GroupName",
            prefix
        )));
    }
    Ok(group)
}

/// Whether `id` looks like `sg-[a-z0-9]+`.
fn is_group_id(id: &str) -> bool {
    id.strip_prefix("sg-").is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(pairs: &[(&str, &str)]) -> Ec2Result<Ec2Request> {
        Ec2Request::decode(&QueryParams::from(pairs.to_vec()))
    }

    #[test]
    fn test_action_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!(
            Action::DescribeInstances.response_root(),
            "DescribeInstancesResponse"
        );
    }

    #[test]
    fn test_unrecognized_action() {
        for pairs in [vec![], vec![("Action", "CreateVpc")]] {
            let err = decode(&pairs).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidParameterValue);
            assert_eq!(err.message, "Unrecognized Action");
        }
    }

    #[test]
    fn test_create_group() {
        let request = decode(&[
            ("Action", "CreateSecurityGroup"),
            ("GroupName", "web"),
            ("GroupDescription", "web tier"),
            ("Version", "2014-02-01"),
            ("Signature", "ignored"),
        ])
        .unwrap();
        assert_eq!(
            request,
            Ec2Request::CreateSecurityGroup {
                name: "web".to_string(),
                description: "web tier".to_string(),
            }
        );
        assert_eq!(request.action(), Action::CreateSecurityGroup);
    }

    #[test]
    fn test_delete_requires_group() {
        let err = decode(&[("Action", "DeleteSecurityGroup")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameterValue);

        let request = decode(&[
            ("Action", "DeleteSecurityGroup"),
            ("GroupId", "sg-1"),
            ("GroupName", "web"),
        ])
        .unwrap();
        assert_eq!(
            request,
            Ec2Request::DeleteSecurityGroup {
                group: GroupRef::by_both("sg-1", "web")
            }
        );
    }

    #[test]
    fn test_describe_groups_refs_and_filter() {
        let request = decode(&[
            ("Action", "DescribeSecurityGroups"),
            ("GroupName.1", "web"),
            ("GroupId.1", "sg-3"),
            ("Filter.1.Name", "ip-permission.from-port"),
            ("Filter.1.Value.1", "200"),
        ])
        .unwrap();
        let Ec2Request::DescribeSecurityGroups { groups, filter } = request else {
            panic!("wrong request");
        };
        assert_eq!(groups, vec![GroupRef::by_id("sg-3"), GroupRef::by_name("web")]);
        assert_eq!(filter.values("ip-permission.from-port").unwrap(), &["200".to_string()]);
    }

    #[test]
    fn test_authorize_permissions() {
        let request = decode(&[
            ("Action", "AuthorizeSecurityGroupIngress"),
            ("GroupId", "sg-0"),
            ("IpPermissions.2.IpProtocol", "udp"),
            ("IpPermissions.2.FromPort", "53"),
            ("IpPermissions.2.ToPort", "53"),
            ("IpPermissions.2.IpRanges.1.CidrIp", "10.0.0.0/8"),
            ("IpPermissions.1.IpProtocol", "tcp"),
            ("IpPermissions.1.FromPort", "0"),
            ("IpPermissions.1.ToPort", "1024"),
            ("IpPermissions.1.Groups.2.GroupName", "other"),
            ("IpPermissions.1.Groups.1.GroupId", "sg-1a2b"),
            ("IpPermissions.1.Groups.1.UserId", "9876"),
            ("IpPermissions.1.IpRanges.1.CidrIp", "127.0.0.1/24"),
        ])
        .unwrap();
        let Ec2Request::AuthorizeSecurityGroupIngress { group, permissions } = request else {
            panic!("wrong request");
        };
        assert_eq!(group, GroupRef::by_id("sg-0"));
        assert_eq!(
            permissions,
            vec![
                IpPermissionSpec::new("tcp", 0, 1024)
                    .with_group(UserGroupRef::by_id("sg-1a2b").with_owner("9876"))
                    .with_group(UserGroupRef::by_name("other"))
                    .with_cidr("127.0.0.1/24"),
                IpPermissionSpec::new("udp", 53, 53).with_cidr("10.0.0.0/8"),
            ]
        );
    }

    #[test]
    fn test_all_traffic_rule_needs_no_ports() {
        let request = decode(&[
            ("Action", "RevokeSecurityGroupIngress"),
            ("GroupName", "web"),
            ("IpPermissions.1.IpProtocol", "-1"),
            ("IpPermissions.1.IpRanges.1.CidrIp", "0.0.0.0/0"),
        ])
        .unwrap();
        let Ec2Request::RevokeSecurityGroupIngress { permissions, .. } = request else {
            panic!("wrong request");
        };
        assert_eq!(permissions[0].from_port, -1);
        assert_eq!(permissions[0].to_port, -1);
    }

    #[test]
    fn test_permission_decoding_errors() {
        let base = [
            ("Action", "AuthorizeSecurityGroupIngress"),
            ("GroupName", "web"),
            ("IpPermissions.1.IpProtocol", "tcp"),
            ("IpPermissions.1.FromPort", "80"),
            ("IpPermissions.1.ToPort", "80"),
        ];
        let with = |extra: (&'static str, &'static str)| {
            let mut pairs = base.to_vec();
            pairs.push(extra);
            decode(&pairs).unwrap_err().code
        };

        assert_eq!(
            with(("IpPermissions.1.Bogus", "x")),
            ErrorCode::UnknownParameter
        );
        assert_eq!(
            with(("IpPermissions.1.Groups.1.GroupId", "sg-NOPE")),
            ErrorCode::GroupIdMalformed
        );
        assert_eq!(
            with(("IpPermissions.1.Groups.1.GroupId", "group-1")),
            ErrorCode::GroupIdMalformed
        );
        assert_eq!(
            with(("IpPermissions.1.Groups.1.UserId", "owner")),
            ErrorCode::UserIdMalformed
        );
        assert_eq!(
            with(("IpPermissions.1.IpRanges.1.Cidr", "1.2.3.4/32")),
            ErrorCode::UnknownParameter
        );

        let mut bad_port = base.to_vec();
        bad_port[3] = ("IpPermissions.1.FromPort", "eighty");
        assert_eq!(
            decode(&bad_port).unwrap_err().code,
            ErrorCode::InvalidParameterValue
        );
    }

    #[test]
    fn test_run_instances() {
        let request = decode(&[
            ("Action", "RunInstances"),
            ("ImageId", "ami-ccf405a5"),
            ("InstanceType", "t1.micro"),
            ("MinCount", "2"),
            ("MaxCount", "3"),
            ("SecurityGroup.1", "web"),
            ("SecurityGroupId.1", "sg-4"),
            ("UserData", "aGVsbG8="),
        ])
        .unwrap();
        let Ec2Request::RunInstances(run) = request else {
            panic!("wrong request");
        };
        assert_eq!(run.image_id, "ami-ccf405a5");
        assert_eq!(run.instance_type.as_deref(), Some("t1.micro"));
        assert_eq!(run.min_count, Some(2));
        assert_eq!(run.max_count, Some(3));
        assert_eq!(
            run.security_groups,
            vec![GroupRef::by_id("sg-4"), GroupRef::by_name("web")]
        );
        assert_eq!(run.user_data, b"hello");
    }

    #[test]
    fn test_run_instances_errors() {
        let code = |pairs: &[(&str, &str)]| decode(pairs).unwrap_err().code;
        assert_eq!(
            code(&[("Action", "RunInstances")]),
            ErrorCode::InvalidParameterValue
        );
        assert_eq!(
            code(&[("Action", "RunInstances"), ("ImageId", "ami-1"), ("MinCount", "x")]),
            ErrorCode::InvalidParameterValue
        );
        assert_eq!(
            code(&[("Action", "RunInstances"), ("ImageId", "ami-1"), ("MaxCount", "0")]),
            ErrorCode::InvalidParameterValue
        );
        assert_eq!(
            code(&[
                ("Action", "RunInstances"),
                ("ImageId", "ami-1"),
                ("MinCount", "3"),
                ("MaxCount", "2"),
            ]),
            ErrorCode::InvalidParameterCombination
        );
        assert_eq!(
            code(&[("Action", "RunInstances"), ("ImageId", "ami-1"), ("UserData", "!!")]),
            ErrorCode::InvalidParameterValue
        );
    }

    #[test]
    fn test_instance_id_lists() {
        let request = decode(&[
            ("Action", "TerminateInstances"),
            ("InstanceId.2", "i-1"),
            ("InstanceId.1", "i-0"),
        ])
        .unwrap();
        assert_eq!(
            request,
            Ec2Request::TerminateInstances {
                instance_ids: vec![InstanceId::new("i-0"), InstanceId::new("i-1")]
            }
        );

        let err = decode(&[("Action", "TerminateInstances")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameterValue);

        let request = decode(&[("Action", "DescribeInstances")]).unwrap();
        assert_eq!(
            request,
            Ec2Request::DescribeInstances {
                instance_ids: vec![],
                filter: Filter::new()
            }
        );
    }

    #[test]
    fn test_group_id_shape() {
        assert!(is_group_id("sg-0"));
        assert!(is_group_id("sg-1a2b3c"));
        assert!(!is_group_id("sg-"));
        assert!(!is_group_id("sg-ABC"));
        assert!(!is_group_id("g-1"));
    }
}
