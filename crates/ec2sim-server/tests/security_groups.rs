//! Security group behaviour over the query protocol.

mod common;

use common::Endpoint;
use ec2sim_core::prelude::*;
use ec2sim_server::xml::{ReturnResponse, SecurityGroupItem};

fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort();
    items
}

fn names(groups: &[SecurityGroupItem]) -> Vec<String> {
    sorted(&groups.iter().map(|g| g.group_name.clone()).collect::<Vec<_>>())
}

#[tokio::test]
async fn test_ip_permissions_lifecycle() {
    let ep = Endpoint::new();
    let g0 = ep.create_group("goamz-test0", "goamz-test0 description").await;
    let g1 = ep.create_group("goamz-test1", "goamz-test1 description").await;

    ep.ok::<ReturnResponse>(&[
        ("Action", "AuthorizeSecurityGroupIngress"),
        ("GroupId", g0.as_str()),
        ("IpPermissions.1.IpProtocol", "tcp"),
        ("IpPermissions.1.FromPort", "2000"),
        ("IpPermissions.1.ToPort", "2001"),
        ("IpPermissions.1.IpRanges.1.CidrIp", "127.0.0.0/24"),
        ("IpPermissions.1.Groups.1.GroupName", "goamz-test1"),
        ("IpPermissions.1.Groups.2.GroupId", g0.as_str()),
        ("IpPermissions.2.IpProtocol", "tcp"),
        ("IpPermissions.2.FromPort", "2000"),
        ("IpPermissions.2.ToPort", "2001"),
        ("IpPermissions.2.IpRanges.1.CidrIp", "200.1.1.34/32"),
    ])
    .await;

    let groups = ep.describe_groups(&[("GroupId.1", g0.as_str())]).await;
    assert_eq!(groups.len(), 1);
    let perms = &groups[0].ip_permissions.item;
    assert_eq!(perms.len(), 1);
    assert_eq!(perms[0].ip_protocol, "tcp");
    assert_eq!((perms[0].from_port, perms[0].to_port), (2000, 2001));

    let mut sources: Vec<(String, String, String)> = perms[0]
        .groups
        .iter()
        .map(|g| (g.group_id.clone(), g.group_name.clone(), g.user_id.clone()))
        .collect();
    sources.sort();
    let mut expected = vec![
        (g0.clone(), "goamz-test0".to_string(), "9876".to_string()),
        (g1.clone(), "goamz-test1".to_string(), "9876".to_string()),
    ];
    expected.sort();
    assert_eq!(sources, expected);
    let cidrs: Vec<String> = perms[0].ip_ranges.iter().map(|r| r.cidr_ip.clone()).collect();
    assert_eq!(sorted(&cidrs), vec!["127.0.0.0/24", "200.1.1.34/32"]);

    let err = ep
        .err(&[("Action", "DeleteSecurityGroup"), ("GroupId", g1.as_str())])
        .await;
    assert_eq!(err.code(), "InvalidGroup.InUse");

    ep.ok::<ReturnResponse>(&[
        ("Action", "RevokeSecurityGroupIngress"),
        ("GroupName", "goamz-test0"),
        ("IpPermissions.1.IpProtocol", "tcp"),
        ("IpPermissions.1.FromPort", "2000"),
        ("IpPermissions.1.ToPort", "2001"),
        ("IpPermissions.1.Groups.1.GroupId", g1.as_str()),
        ("IpPermissions.1.IpRanges.1.CidrIp", "200.1.1.34/32"),
    ])
    .await;

    let groups = ep.describe_groups(&[("GroupName.1", "goamz-test0")]).await;
    let perm = &groups[0].ip_permissions.item[0];
    assert_eq!(perm.groups.len(), 1);
    assert_eq!(perm.groups.item[0].group_id, g0);
    assert_eq!(perm.ip_ranges.len(), 1);
    assert_eq!(perm.ip_ranges.item[0].cidr_ip, "127.0.0.0/24");

    ep.ok::<ReturnResponse>(&[
        ("Action", "DeleteSecurityGroup"),
        ("GroupId", g1.as_str()),
    ])
    .await;
    // A group referencing only itself can still go.
    ep.ok::<ReturnResponse>(&[
        ("Action", "DeleteSecurityGroup"),
        ("GroupId", g0.as_str()),
    ])
    .await;
    assert!(ep.describe_groups(&[]).await.is_empty());
}

#[tokio::test]
async fn test_group_names_are_unique() {
    let ep = Endpoint::new();
    ep.create_group("web", "first").await;
    let err = ep
        .err(&[
            ("Action", "CreateSecurityGroup"),
            ("GroupName", "web"),
            ("GroupDescription", "second"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidGroup.Duplicate");

    let groups = ep.describe_groups(&[]).await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_description, "first");
}

#[tokio::test]
async fn test_in_use_released_by_deleting_referrer() {
    let ep = Endpoint::new();
    let a = ep.create_group("a", "").await;
    let b = ep.create_group("b", "").await;
    ep.ok::<ReturnResponse>(&[
        ("Action", "AuthorizeSecurityGroupIngress"),
        ("GroupId", a.as_str()),
        ("IpPermissions.1.IpProtocol", "udp"),
        ("IpPermissions.1.FromPort", "53"),
        ("IpPermissions.1.ToPort", "53"),
        ("IpPermissions.1.Groups.1.GroupId", b.as_str()),
    ])
    .await;

    let err = ep.err(&[("Action", "DeleteSecurityGroup"), ("GroupName", "b")]).await;
    assert_eq!(err.code(), "InvalidGroup.InUse");
    assert!(err.message().contains(&a));

    ep.ok::<ReturnResponse>(&[("Action", "DeleteSecurityGroup"), ("GroupId", a.as_str())])
        .await;
    ep.ok::<ReturnResponse>(&[("Action", "DeleteSecurityGroup"), ("GroupId", b.as_str())])
        .await;
}

fn borrow(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn authorize_cidrs(group: &str, cidrs: &[&str]) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("Action".to_string(), "AuthorizeSecurityGroupIngress".to_string()),
        ("GroupId".to_string(), group.to_string()),
        ("IpPermissions.1.IpProtocol".to_string(), "tcp".to_string()),
        ("IpPermissions.1.FromPort".to_string(), "80".to_string()),
        ("IpPermissions.1.ToPort".to_string(), "80".to_string()),
    ];
    for (i, cidr) in cidrs.iter().enumerate() {
        pairs.push((
            format!("IpPermissions.1.IpRanges.{}.CidrIp", i + 1),
            cidr.to_string(),
        ));
    }
    pairs
}

#[tokio::test]
async fn test_duplicate_and_union() {
    let ep = Endpoint::new();
    let g = ep.create_group("g", "").await;

    let first = authorize_cidrs(&g, &["10.0.0.0/8"]);
    let (status, _) = ep.post(&borrow(&first)).await;
    assert!(status.is_success());

    let err = ep.err(&borrow(&first)).await;
    assert_eq!(err.code(), "InvalidPermission.Duplicate");

    let superset = authorize_cidrs(&g, &["10.0.0.0/8", "192.168.0.0/16"]);
    let (status, body) = ep.post(&borrow(&superset)).await;
    assert!(status.is_success(), "{}", body);

    let groups = ep.describe_groups(&[]).await;
    let cidrs: Vec<String> = groups[0].ip_permissions.item[0]
        .ip_ranges
        .iter()
        .map(|r| r.cidr_ip.clone())
        .collect();
    assert_eq!(sorted(&cidrs), vec!["10.0.0.0/8", "192.168.0.0/16"]);
}

#[tokio::test]
async fn test_malformed_cidr_leaves_group_untouched() {
    let ep = Endpoint::new();
    let g = ep.create_group("g", "").await;
    let err = ep
        .err(&[
            ("Action", "AuthorizeSecurityGroupIngress"),
            ("GroupId", g.as_str()),
            ("IpPermissions.1.IpProtocol", "tcp"),
            ("IpPermissions.1.FromPort", "22"),
            ("IpPermissions.1.ToPort", "22"),
            ("IpPermissions.1.IpRanges.1.CidrIp", "10.0.0.0/8"),
            ("IpPermissions.2.IpProtocol", "tcp"),
            ("IpPermissions.2.FromPort", "80"),
            ("IpPermissions.2.ToPort", "80"),
            ("IpPermissions.2.IpRanges.1.CidrIp", "300.0.0.1/32"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidPermission.Malformed");
    assert!(err.message().contains("300.0.0.1/32"));

    let groups = ep.describe_groups(&[]).await;
    assert!(groups[0].ip_permissions.is_empty());
}

/// Three groups with distinct rules, for the filter table below.
async fn filter_fixture(ep: &Endpoint) -> Vec<String> {
    let g0 = ep.create_group("testgroup0", "testgroup0 description").await;
    let g1 = ep.create_group("testgroup1", "testgroup1 description").await;
    let g2 = ep.create_group("testgroup2", "testgroup2 description").await;

    let rules: [(&str, &str, &str, &str, (&str, &str)); 3] = [
        (g0.as_str(), "tcp", "2000", "2001", ("IpRanges.1.CidrIp", "127.0.0.0/24")),
        (g1.as_str(), "tcp", "200", "300", ("Groups.1.GroupName", "testgroup0")),
        (g2.as_str(), "udp", "200", "400", ("IpRanges.1.CidrIp", "1.2.3.4/32")),
    ];
    for (group, proto, from, to, (source_key, source)) in rules {
        let source_key = format!("IpPermissions.1.{}", source_key);
        ep.ok::<ReturnResponse>(&[
            ("Action", "AuthorizeSecurityGroupIngress"),
            ("GroupId", group),
            ("IpPermissions.1.IpProtocol", proto),
            ("IpPermissions.1.FromPort", from),
            ("IpPermissions.1.ToPort", to),
            (source_key.as_str(), source),
        ])
        .await;
    }
    vec![g0, g1, g2]
}

#[tokio::test]
async fn test_describe_filters() {
    let ep = Endpoint::new();
    let ids = filter_fixture(&ep).await;

    let cases: Vec<(Vec<(&str, Vec<&str>)>, Vec<&str>)> = vec![
        (vec![("ip-permission.from-port", vec!["200"])], vec!["testgroup1", "testgroup2"]),
        (vec![("ip-permission.to-port", vec!["2001"])], vec!["testgroup0"]),
        (vec![("ip-permission.protocol", vec!["udp"])], vec!["testgroup2"]),
        (vec![("ip-permission.cidr", vec!["127.0.0.0/24", "1.2.3.4/32"])], vec!["testgroup0", "testgroup2"]),
        (vec![("ip-permission.group-name", vec!["testgroup0"])], vec!["testgroup1"]),
        (vec![("description", vec!["testgroup1 description"])], vec!["testgroup1"]),
        (vec![("group-id", vec![ids[2].as_str()])], vec!["testgroup2"]),
        (
            vec![
                ("ip-permission.protocol", vec!["tcp"]),
                ("ip-permission.from-port", vec!["200"]),
            ],
            vec!["testgroup1"],
        ),
        (
            vec![
                ("ip-permission.protocol", vec!["udp"]),
                ("ip-permission.to-port", vec!["2001"]),
            ],
            vec![],
        ),
    ];

    for (filters, expected) in cases {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (i, (name, values)) in filters.iter().enumerate() {
            pairs.push((format!("Filter.{}.Name", i + 1), name.to_string()));
            for (j, value) in values.iter().enumerate() {
                pairs.push((format!("Filter.{}.Value.{}", i + 1, j + 1), value.to_string()));
            }
        }
        let groups = ep.describe_groups(&borrow(&pairs)).await;
        assert_eq!(names(&groups), expected, "filters {:?}", filters);
    }
}

#[tokio::test]
async fn test_refs_intersect_filter() {
    let ep = Endpoint::new();
    filter_fixture(&ep).await;

    let groups = ep
        .describe_groups(&[
            ("GroupName.1", "testgroup0"),
            ("GroupName.2", "testgroup1"),
            ("Filter.1.Name", "ip-permission.from-port"),
            ("Filter.1.Value.1", "200"),
        ])
        .await;
    assert_eq!(names(&groups), vec!["testgroup1"]);

    let err = ep
        .err(&[
            ("Action", "DescribeSecurityGroups"),
            ("GroupName.1", "testgroup0"),
            ("GroupName.2", "nosuchgroup"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidGroup.NotFound");
}

#[tokio::test]
async fn test_filter_errors() {
    let ep = Endpoint::new();
    let err = ep
        .err(&[
            ("Action", "DescribeSecurityGroups"),
            ("Filter.1.Name", "colour"),
            ("Filter.1.Value.1", "blue"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidParameterValue");

    let err = ep
        .err(&[
            ("Action", "DescribeSecurityGroups"),
            ("Filter.1.Name", "ip-permission.from-port"),
            ("Filter.1.Value.1", "eighty"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidParameterValue");
}

#[tokio::test]
async fn test_default_group() {
    let ep = Endpoint::with_config(StoreConfig::default());
    let groups = ep.describe_groups(&[("GroupName.1", "default")]).await;
    assert_eq!(groups.len(), 1);
    let default = &groups[0];
    assert_eq!(default.group_description, "default group");
    assert_eq!(default.owner_id, "9876");

    let protocols: Vec<String> = default
        .ip_permissions
        .iter()
        .map(|p| p.ip_protocol.clone())
        .collect();
    assert_eq!(sorted(&protocols), vec!["icmp", "tcp", "udp"]);
    for perm in default.ip_permissions.iter() {
        assert_eq!(perm.groups.item[0].group_id, default.group_id);
    }
}

#[tokio::test]
async fn test_source_group_owner_must_match() {
    let ep = Endpoint::new();
    let g = ep.create_group("g", "").await;
    let err = ep
        .err(&[
            ("Action", "AuthorizeSecurityGroupIngress"),
            ("GroupId", g.as_str()),
            ("IpPermissions.1.IpProtocol", "tcp"),
            ("IpPermissions.1.FromPort", "1"),
            ("IpPermissions.1.ToPort", "2"),
            ("IpPermissions.1.Groups.1.GroupName", "g"),
            ("IpPermissions.1.Groups.1.UserId", "1234"),
        ])
        .await;
    assert_eq!(err.code(), "InvalidGroup.NotFound");
}

#[tokio::test]
async fn test_strict_revoke() {
    let ep = Endpoint::with_config(StoreConfig::empty().with_revoke_policy(RevokePolicy::Strict));
    let g = ep.create_group("g", "").await;
    let revoke = [
        ("Action", "RevokeSecurityGroupIngress"),
        ("GroupId", g.as_str()),
        ("IpPermissions.1.IpProtocol", "tcp"),
        ("IpPermissions.1.FromPort", "80"),
        ("IpPermissions.1.ToPort", "80"),
        ("IpPermissions.1.IpRanges.1.CidrIp", "10.0.0.0/8"),
    ];
    let err = ep.err(&revoke).await;
    assert_eq!(err.code(), "InvalidPermission.NotFound");

    // The same request is a no-op under the lenient default.
    let lenient = Endpoint::new();
    let g = lenient.create_group("g", "").await;
    let mut revoke = revoke.to_vec();
    revoke[1] = ("GroupId", g.as_str());
    let (status, _) = lenient.post(&revoke).await;
    assert!(status.is_success());
}
