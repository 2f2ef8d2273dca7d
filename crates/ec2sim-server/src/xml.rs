//! XML documents exchanged with provider clients.
//!
//! Every response is a plain serde struct written with `quick-xml`. The
//! structs also deserialize, which is how the integration tests (and any
//! Rust client of the endpoint) read responses back.
//!
//! List-valued elements follow the provider's convention of wrapping each
//! entry in an `<item>` element; see [`ItemSet`].

use serde::{Deserialize, Serialize};

use ec2sim_core::{
    Ec2Error, Instance, InstanceStateChange, InstanceStateName, IpPermission, Reservation,
    SecurityGroup,
};

use crate::error::{ServerError, ServerResult};

/// Namespace of every success document.
pub const NAMESPACE: &str = "http://ec2.amazonaws.com/doc/2014-02-01/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize `body` as a document whose root element is `root`.
pub fn to_xml<T: Serialize>(root: &str, body: &T) -> ServerResult<String> {
    let mut xml = String::from(XML_DECLARATION);
    let serializer =
        quick_xml::se::Serializer::with_root(&mut xml, Some(root)).map_err(xml_error)?;
    body.serialize(serializer).map_err(xml_error)?;
    Ok(xml)
}

/// Read a document back into one of the response structs.
pub fn from_xml<T: for<'de> Deserialize<'de>>(xml: &str) -> ServerResult<T> {
    quick_xml::de::from_str(xml).map_err(xml_error)
}

fn xml_error(err: impl std::fmt::Display) -> ServerError {
    ServerError::Xml(err.to_string())
}

/// A list of `<item>` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSet<T> {
    #[serde(default = "Vec::new")]
    pub item: Vec<T>,
}

impl<T> ItemSet<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { item: items }
    }

    pub fn len(&self) -> usize {
        self.item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.item.iter()
    }
}

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self { item: Vec::new() }
    }
}

impl<T> FromIterator<T> for ItemSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn namespace() -> String {
    NAMESPACE.to_string()
}

/// `CreateSecurityGroupResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecurityGroupResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    #[serde(rename = "return")]
    pub success: bool,
    pub group_id: String,
}

/// Responses that only acknowledge: delete, authorize and revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    #[serde(rename = "return")]
    pub success: bool,
}

/// `DescribeSecurityGroupsResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeSecurityGroupsResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    #[serde(default)]
    pub security_group_info: ItemSet<SecurityGroupItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupItem {
    pub owner_id: String,
    pub group_id: String,
    pub group_name: String,
    pub group_description: String,
    #[serde(default)]
    pub ip_permissions: ItemSet<IpPermissionItem>,
}

impl From<&SecurityGroup> for SecurityGroupItem {
    fn from(group: &SecurityGroup) -> Self {
        Self {
            owner_id: group.owner_id.clone(),
            group_id: group.id.to_string(),
            group_name: group.name.clone(),
            group_description: group.description.clone(),
            ip_permissions: group.ip_permissions().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpPermissionItem {
    pub ip_protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    #[serde(default)]
    pub groups: ItemSet<UserGroupItem>,
    #[serde(default)]
    pub ip_ranges: ItemSet<IpRangeItem>,
}

impl From<&IpPermission> for IpPermissionItem {
    fn from(perm: &IpPermission) -> Self {
        Self {
            ip_protocol: perm.protocol.clone(),
            from_port: perm.from_port,
            to_port: perm.to_port,
            groups: perm
                .source_groups
                .iter()
                .map(|g| UserGroupItem {
                    user_id: g.owner_id.clone(),
                    group_id: g.id.to_string(),
                    group_name: g.name.clone(),
                })
                .collect(),
            ip_ranges: perm
                .source_ips
                .iter()
                .map(|cidr| IpRangeItem {
                    cidr_ip: cidr.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupItem {
    pub user_id: String,
    pub group_id: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpRangeItem {
    pub cidr_ip: String,
}

/// `RunInstancesResponse`: the new reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInstancesResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    pub reservation_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub group_set: ItemSet<GroupItem>,
    #[serde(default)]
    pub instances_set: ItemSet<InstanceItem>,
}

/// `DescribeInstancesResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeInstancesResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    #[serde(default)]
    pub reservation_set: ItemSet<ReservationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    pub reservation_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub group_set: ItemSet<GroupItem>,
    #[serde(default)]
    pub instances_set: ItemSet<InstanceItem>,
}

impl ReservationItem {
    /// Group instances into reservation items, keeping first-seen order.
    ///
    /// A reservation's groups are those of its instances, which all share
    /// the groups they were launched with.
    pub fn group(instances: &[Instance]) -> Vec<ReservationItem> {
        let mut items: Vec<ReservationItem> = Vec::new();
        for instance in instances {
            let reservation_id = instance.reservation_id.as_str();
            match items
                .iter_mut()
                .find(|item| item.reservation_id == reservation_id)
            {
                Some(item) => item.instances_set.item.push(instance.into()),
                None => items.push(ReservationItem {
                    reservation_id: reservation_id.to_string(),
                    owner_id: instance.owner_id.clone(),
                    group_set: instance
                        .security_groups
                        .iter()
                        .map(|g| GroupItem {
                            group_id: g.id.to_string(),
                            group_name: g.name.clone(),
                        })
                        .collect(),
                    instances_set: ItemSet::new(vec![instance.into()]),
                }),
            }
        }
        items
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupItem {
    pub group_id: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceItem {
    pub instance_id: String,
    pub image_id: String,
    pub instance_state: InstanceStateItem,
    pub dns_name: String,
    pub instance_type: String,
    pub ami_launch_index: u32,
}

impl From<&Instance> for InstanceItem {
    fn from(instance: &Instance) -> Self {
        Self {
            instance_id: instance.id.to_string(),
            image_id: instance.image_id.clone(),
            instance_state: instance.state.into(),
            dns_name: instance.dns_name.clone(),
            instance_type: instance.instance_type.clone(),
            ami_launch_index: instance.launch_index,
        }
    }
}

/// A `{code, name}` state pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStateItem {
    pub code: i32,
    pub name: String,
}

impl From<InstanceStateName> for InstanceStateItem {
    fn from(state: InstanceStateName) -> Self {
        Self {
            code: state.code(),
            name: state.as_str().to_string(),
        }
    }
}

/// `TerminateInstancesResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateInstancesResponse {
    #[serde(rename = "@xmlns", default = "namespace")]
    pub xmlns: String,
    pub request_id: String,
    #[serde(default)]
    pub instances_set: ItemSet<InstanceStateChangeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStateChangeItem {
    pub instance_id: String,
    pub current_state: InstanceStateItem,
    pub previous_state: InstanceStateItem,
}

impl From<&InstanceStateChange> for InstanceStateChangeItem {
    fn from(change: &InstanceStateChange) -> Self {
        Self {
            instance_id: change.instance.id.to_string(),
            current_state: change.current_state.into(),
            previous_state: change.previous_state.into(),
        }
    }
}

impl RunInstancesResponse {
    pub fn new(request_id: String, reservation: &Reservation) -> Self {
        Self {
            xmlns: namespace(),
            request_id,
            reservation_id: reservation.id.to_string(),
            owner_id: reservation.owner_id.clone(),
            group_set: reservation
                .groups
                .iter()
                .map(|g| GroupItem {
                    group_id: g.id.to_string(),
                    group_name: g.name.clone(),
                })
                .collect(),
            instances_set: reservation.instances.iter().map(Into::into).collect(),
        }
    }
}

/// Root element of the error document.
pub const ERROR_ROOT: &str = "Response";

/// The error document: `<Response><Errors><Error>..</Error></Errors><RequestID/></Response>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub errors: ErrorList,
    #[serde(rename = "RequestID")]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorList {
    pub error: ErrorItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorItem {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(request_id: String, err: &Ec2Error) -> Self {
        Self {
            errors: ErrorList {
                error: ErrorItem {
                    code: err.code.as_str().to_string(),
                    message: err.message.clone(),
                },
            },
            request_id,
        }
    }

    pub fn code(&self) -> &str {
        &self.errors.error.code
    }

    pub fn message(&self) -> &str {
        &self.errors.error.message
    }
}

/// Build an acknowledgement document body.
pub fn acknowledge(request_id: String) -> ReturnResponse {
    ReturnResponse {
        xmlns: namespace(),
        request_id,
        success: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec2sim_core::prelude::*;

    #[test]
    fn test_acknowledgement_document() {
        let xml = to_xml("DeleteSecurityGroupResponse", &acknowledge("req-1".into())).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(&format!(
            r#"<DeleteSecurityGroupResponse xmlns="{}">"#,
            NAMESPACE
        )));
        assert!(xml.contains("<requestId>req-1</requestId>"));
        assert!(xml.contains("<return>true</return>"));
    }

    #[test]
    fn test_error_document() {
        let err = Ec2Error::instance_not_found("i-deadbeef");
        let xml = to_xml(ERROR_ROOT, &ErrorResponse::new("req-2".into(), &err)).unwrap();
        assert!(xml.contains(
            "<Response><Errors><Error><Code>InvalidInstanceID.NotFound</Code><Message>"
        ));
        assert!(xml.contains("<RequestID>req-2</RequestID></Response>"));

        let back: ErrorResponse = from_xml(&xml).unwrap();
        assert_eq!(back.code(), "InvalidInstanceID.NotFound");
        assert_eq!(back.message(), err.message);
    }

    #[test]
    fn test_text_is_escaped() {
        let err = Ec2Error::invalid_parameter("bad <value> & more");
        let xml = to_xml(ERROR_ROOT, &ErrorResponse::new("r".into(), &err)).unwrap();
        assert!(xml.contains("bad &lt;value&gt; &amp; more"));
        let back: ErrorResponse = from_xml(&xml).unwrap();
        assert_eq!(back.message(), "bad <value> & more");
    }

    #[test]
    fn test_security_group_document() {
        let store = ResourceStore::new(StoreConfig::empty());
        let web = store.create_group("web", "web tier").unwrap();
        let web = store
            .authorize_ingress(
                &GroupRef::by_id(web.id.clone()),
                &[IpPermissionSpec::new("tcp", 80, 81)
                    .with_cidr("10.0.0.0/8")
                    .with_group(UserGroupRef::by_name("web"))],
            )
            .unwrap();

        let response = DescribeSecurityGroupsResponse {
            xmlns: NAMESPACE.to_string(),
            request_id: "req".to_string(),
            security_group_info: ItemSet::new(vec![SecurityGroupItem::from(&web)]),
        };
        let xml = to_xml("DescribeSecurityGroupsResponse", &response).unwrap();
        assert!(xml.contains("<securityGroupInfo><item><ownerId>9876</ownerId>"));
        assert!(xml.contains("<ipRanges><item><cidrIp>10.0.0.0/8</cidrIp></item></ipRanges>"));

        let back: DescribeSecurityGroupsResponse = from_xml(&xml).unwrap();
        assert_eq!(back, response);
        let perm = &back.security_group_info.item[0].ip_permissions.item[0];
        assert_eq!(perm.from_port, 80);
        assert_eq!(perm.groups.item[0].group_name, "web");
        assert_eq!(perm.groups.item[0].user_id, "9876");
    }

    #[test]
    fn test_reservation_grouping() {
        let store = ResourceStore::new(StoreConfig::empty());
        store.create_group("g", "").unwrap();
        let first = store
            .run_instances(
                &RunInstancesParams::new("ami-1")
                    .with_min_count(2)
                    .with_group(GroupRef::by_name("g")),
            )
            .unwrap();
        let second = store.run_instances(&RunInstancesParams::new("ami-2")).unwrap();

        let mut instances = first.instances.clone();
        instances.extend(second.instances.clone());
        let items = ReservationItem::group(&instances);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].reservation_id, first.id.as_str());
        assert_eq!(items[0].instances_set.len(), 2);
        assert_eq!(items[0].group_set.item[0].group_name, "g");
        assert_eq!(items[1].instances_set.len(), 1);
        assert!(items[1].group_set.is_empty());
    }

    #[test]
    fn test_empty_sets_round_trip() {
        let store = ResourceStore::new(StoreConfig::empty());
        let reservation = store.run_instances(&RunInstancesParams::new("ami-1")).unwrap();
        let response = RunInstancesResponse::new("req".to_string(), &reservation);
        let xml = to_xml("RunInstancesResponse", &response).unwrap();
        let back: RunInstancesResponse = from_xml(&xml).unwrap();
        assert_eq!(back, response);
        assert!(back.group_set.is_empty());
        assert_eq!(back.instances_set.item[0].instance_state.name, "running");
        assert_eq!(back.instances_set.item[0].instance_state.code, 16);
    }
}
