//! Typed results of handled requests and their XML rendering.

use ec2sim_core::{Ec2Result, Instance, InstanceStateChange, Reservation, SecurityGroup};
use ec2sim_observe::RequestId;

use crate::error::ServerResult;
use crate::request::Action;
use crate::xml::{
    self, CreateSecurityGroupResponse, DescribeInstancesResponse,
    DescribeSecurityGroupsResponse, ERROR_ROOT, ErrorResponse, ItemSet, NAMESPACE,
    ReservationItem, RunInstancesResponse, TerminateInstancesResponse,
};

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ec2Response {
    /// A new security group.
    GroupCreated(SecurityGroup),
    /// A plain acknowledgement for the given action.
    Acknowledged(Action),
    /// Matching security groups.
    SecurityGroups(Vec<SecurityGroup>),
    /// A launched reservation.
    Launched(Reservation),
    /// Per-instance termination results.
    Terminated(Vec<InstanceStateChange>),
    /// Matching instances, grouped by reservation when rendered.
    Instances(Vec<Instance>),
}

impl Ec2Response {
    /// The action this response answers.
    pub fn action(&self) -> Action {
        match self {
            Ec2Response::GroupCreated(_) => Action::CreateSecurityGroup,
            Ec2Response::Acknowledged(action) => *action,
            Ec2Response::SecurityGroups(_) => Action::DescribeSecurityGroups,
            Ec2Response::Launched(_) => Action::RunInstances,
            Ec2Response::Terminated(_) => Action::TerminateInstances,
            Ec2Response::Instances(_) => Action::DescribeInstances,
        }
    }

    /// Render the success document.
    pub fn to_xml(&self, request_id: RequestId) -> ServerResult<String> {
        let root = self.action().response_root();
        let request_id = request_id.to_string();
        match self {
            Ec2Response::GroupCreated(group) => xml::to_xml(
                &root,
                &CreateSecurityGroupResponse {
                    xmlns: NAMESPACE.to_string(),
                    request_id,
                    success: true,
                    group_id: group.id.to_string(),
                },
            ),
            Ec2Response::Acknowledged(_) => xml::to_xml(&root, &xml::acknowledge(request_id)),
            Ec2Response::SecurityGroups(groups) => xml::to_xml(
                &root,
                &DescribeSecurityGroupsResponse {
                    xmlns: NAMESPACE.to_string(),
                    request_id,
                    security_group_info: groups.iter().map(Into::into).collect(),
                },
            ),
            Ec2Response::Launched(reservation) => {
                xml::to_xml(&root, &RunInstancesResponse::new(request_id, reservation))
            }
            Ec2Response::Terminated(changes) => xml::to_xml(
                &root,
                &TerminateInstancesResponse {
                    xmlns: NAMESPACE.to_string(),
                    request_id,
                    instances_set: changes.iter().map(Into::into).collect(),
                },
            ),
            Ec2Response::Instances(instances) => xml::to_xml(
                &root,
                &DescribeInstancesResponse {
                    xmlns: NAMESPACE.to_string(),
                    request_id,
                    reservation_set: ItemSet::new(ReservationItem::group(instances)),
                },
            ),
        }
    }
}

/// The outcome of one request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub request_id: RequestId,
    /// The `Action` parameter as received, empty when absent.
    pub action: String,
    pub result: Ec2Result<Ec2Response>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Render the response body: a success document or the error document.
    pub fn to_xml(&self) -> ServerResult<String> {
        match &self.result {
            Ok(response) => response.to_xml(self.request_id),
            Err(err) => xml::to_xml(
                ERROR_ROOT,
                &ErrorResponse::new(self.request_id.to_string(), err),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec2sim_core::prelude::*;

    #[test]
    fn test_roots_follow_action() {
        let response = Ec2Response::Acknowledged(Action::RevokeSecurityGroupIngress);
        let xml = response.to_xml(RequestId::new()).unwrap();
        assert!(xml.contains("<RevokeSecurityGroupIngressResponse xmlns="));
        assert_eq!(response.action(), Action::RevokeSecurityGroupIngress);
    }

    #[test]
    fn test_group_created_document() {
        let store = ResourceStore::new(StoreConfig::empty());
        let group = store.create_group("web", "web tier").unwrap();
        let request_id = RequestId::new();
        let xml = Ec2Response::GroupCreated(group.clone())
            .to_xml(request_id)
            .unwrap();
        let doc: CreateSecurityGroupResponse = xml::from_xml(&xml).unwrap();
        assert_eq!(doc.group_id, group.id.as_str());
        assert_eq!(doc.request_id, request_id.to_string());
        assert!(doc.success);
    }

    #[test]
    fn test_error_reply() {
        let reply = Reply {
            request_id: RequestId::new(),
            action: "DeleteSecurityGroup".to_string(),
            result: Err(Ec2Error::group_not_found("The security group 'x' does not exist")),
        };
        assert!(!reply.is_success());
        let doc: ErrorResponse = xml::from_xml(&reply.to_xml().unwrap()).unwrap();
        assert_eq!(doc.code(), "InvalidGroup.NotFound");
        assert_eq!(doc.request_id, reply.request_id.to_string());
    }
}
