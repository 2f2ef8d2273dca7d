//! Filter attributes of instances.

use ec2sim_core::Instance;

use crate::attribute::{Attribute, FilterValue, ValueKind};

/// Predicates accepted when listing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceAttribute {
    InstanceId,
    /// Any attached group has this id.
    GroupId,
    /// Any attached group has this name.
    GroupName,
    ImageId,
    InstanceType,
    /// `instance-state-name`, e.g. `running`.
    StateName,
    /// `instance-state-code`; only the low byte is significant.
    StateCode,
    ReservationId,
    OwnerId,
}

impl Attribute for InstanceAttribute {
    type Target = Instance;
    const KIND: &'static str = "instances";

    fn all() -> &'static [Self] {
        &[
            InstanceAttribute::InstanceId,
            InstanceAttribute::GroupId,
            InstanceAttribute::GroupName,
            InstanceAttribute::ImageId,
            InstanceAttribute::InstanceType,
            InstanceAttribute::StateName,
            InstanceAttribute::StateCode,
            InstanceAttribute::ReservationId,
            InstanceAttribute::OwnerId,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            InstanceAttribute::InstanceId => "instance-id",
            InstanceAttribute::GroupId => "group-id",
            InstanceAttribute::GroupName => "group-name",
            InstanceAttribute::ImageId => "image-id",
            InstanceAttribute::InstanceType => "instance-type",
            InstanceAttribute::StateName => "instance-state-name",
            InstanceAttribute::StateCode => "instance-state-code",
            InstanceAttribute::ReservationId => "reservation-id",
            InstanceAttribute::OwnerId => "owner-id",
        }
    }

    fn value_kind(&self) -> ValueKind {
        match self {
            InstanceAttribute::StateCode => ValueKind::Integer,
            _ => ValueKind::Text,
        }
    }

    fn matches(&self, instance: &Instance, value: &FilterValue) -> bool {
        match self {
            InstanceAttribute::InstanceId => value.is_text(instance.id.as_str()),
            InstanceAttribute::GroupId => instance
                .security_groups
                .iter()
                .any(|g| value.is_text(g.id.as_str())),
            InstanceAttribute::GroupName => instance
                .security_groups
                .iter()
                .any(|g| value.is_text(&g.name)),
            InstanceAttribute::ImageId => value.is_text(&instance.image_id),
            InstanceAttribute::InstanceType => value.is_text(&instance.instance_type),
            InstanceAttribute::StateName => value.is_text(instance.state.as_str()),
            InstanceAttribute::StateCode => value
                .as_integer()
                .is_some_and(|code| code & 0xff == i64::from(instance.state.code() & 0xff)),
            InstanceAttribute::ReservationId => value.is_text(instance.reservation_id.as_str()),
            InstanceAttribute::OwnerId => value.is_text(&instance.owner_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Filter, InstanceFilter};
    use ec2sim_core::prelude::*;

    const IMAGE: &str = "ami-ccf405a5";
    const IMAGE2: &str = "ami-e358958a";

    /// Two instances of IMAGE in testgroup1, one of IMAGE2 in testgroup2.
    fn fixture() -> (ResourceStore, Vec<InstanceId>) {
        let store = ResourceStore::new(StoreConfig::empty());
        store.create_group("testgroup1", "testgroup one description").unwrap();
        store.create_group("testgroup2", "testgroup two description").unwrap();

        let first = store
            .run_instances(
                &RunInstancesParams::new(IMAGE)
                    .with_min_count(2)
                    .with_instance_type("t1.micro")
                    .with_group(GroupRef::by_name("testgroup1")),
            )
            .unwrap();
        let second = store
            .run_instances(
                &RunInstancesParams::new(IMAGE2)
                    .with_instance_type("t1.micro")
                    .with_group(GroupRef::by_name("testgroup2")),
            )
            .unwrap();
        let ids = first
            .instances
            .iter()
            .chain(&second.instances)
            .map(|i| i.id.clone())
            .collect();
        (store, ids)
    }

    fn select(store: &ResourceStore, ids: &[InstanceId], filter: Filter) -> Vec<usize> {
        let compiled = InstanceFilter::compile(&filter).unwrap();
        let mut found: Vec<usize> = store
            .list_instances(&[], &compiled)
            .unwrap()
            .iter()
            .map(|inst| ids.iter().position(|id| id == &inst.id).unwrap())
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_instance_id() {
        let (store, ids) = fixture();
        let both = Filter::new().with("instance-id", [ids[0].as_str(), ids[2].as_str()]);
        assert_eq!(select(&store, &ids, both), vec![0, 2]);
        let one = Filter::new().with("instance-id", [ids[1].as_str()]);
        assert_eq!(select(&store, &ids, one), vec![1]);
        let none = Filter::new().with("instance-id", ["i-deadbeef12345"]);
        assert!(select(&store, &ids, none).is_empty());
    }

    #[test]
    fn test_group_id_and_name() {
        let (store, ids) = fixture();
        let group = store.group(&GroupRef::by_name("testgroup1")).unwrap();
        assert_eq!(
            select(&store, &ids, Filter::new().with("group-id", [group.id.as_str()])),
            vec![0, 1]
        );
        assert_eq!(
            select(&store, &ids, Filter::new().with("group-name", ["testgroup1"])),
            vec![0, 1]
        );
    }

    #[test]
    fn test_image_id_combinations() {
        let (store, ids) = fixture();
        assert_eq!(
            select(&store, &ids, Filter::new().with("image-id", [IMAGE])),
            vec![0, 1]
        );
        let combo = Filter::new()
            .with("image-id", [IMAGE, IMAGE2])
            .with("group-name", ["testgroup1"]);
        assert_eq!(select(&store, &ids, combo), vec![0, 1]);
        let disjoint = Filter::new()
            .with("image-id", [IMAGE2])
            .with("group-name", ["testgroup1"]);
        assert!(select(&store, &ids, disjoint).is_empty());
    }

    #[test]
    fn test_state_predicates() {
        let (store, ids) = fixture();
        store
            .set_instance_state(&ids[1], InstanceStateName::Stopped)
            .unwrap();

        assert_eq!(
            select(&store, &ids, Filter::new().with("instance-state-name", ["running"])),
            vec![0, 2]
        );
        assert_eq!(
            select(&store, &ids, Filter::new().with("instance-state-code", ["80"])),
            vec![1]
        );
        assert_eq!(
            select(&store, &ids, Filter::new().with("instance-state-code", ["272"])),
            vec![0, 2]
        );
    }

    #[test]
    fn test_type_reservation_owner() {
        let (store, ids) = fixture();
        let first = store.instance(&ids[0]).unwrap();
        assert_eq!(
            select(
                &store,
                &ids,
                Filter::new().with("reservation-id", [first.reservation_id.as_str()])
            ),
            vec![0, 1]
        );
        assert_eq!(
            select(&store, &ids, Filter::new().with("instance-type", ["t1.micro"])),
            vec![0, 1, 2]
        );
        assert_eq!(
            select(&store, &ids, Filter::new().with("owner-id", ["9876"])),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_unknown_predicate_rejected() {
        let err = InstanceFilter::compile(&Filter::new().with("ip-permission.cidr", ["1.2.3.4/32"]))
            .unwrap_err();
        assert!(err.to_string().contains("ip-permission.cidr"));
    }
}
