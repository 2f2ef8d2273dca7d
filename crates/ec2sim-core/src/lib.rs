//! ec2sim Core - Simulated EC2 Resource Store
//!
//! This crate provides the state and rules of the ec2sim fake endpoint.
//! It includes:
//!
//! - [`ResourceStore`]: security groups and instances behind one lock
//! - [`PermissionSet`]: ingress rule buckets with union/subtract semantics
//! - [`resolve`]: id-or-name reference resolution
//! - [`Ec2Error`]: the provider's error vocabulary
//! - Configuration types for customizing behavior
//!
//! # Quick Start
//!
//! ```
//! use ec2sim_core::prelude::*;
//!
//! let store = ResourceStore::new(StoreConfig::default());
//! let group = store.create_group("web", "web tier").unwrap();
//!
//! let reservation = store
//!     .run_instances(
//!         &RunInstancesParams::new("ami-12345678")
//!             .with_min_count(2)
//!             .with_group(GroupRef::by_id(group.id.clone())),
//!     )
//!     .unwrap();
//! assert_eq!(reservation.instances.len(), 2);
//!
//! let err = store.create_group("web", "again").unwrap_err();
//! assert_eq!(err.code, ErrorCode::GroupDuplicate);
//! ```
//!
//! # Consistency Model
//!
//! 1. **Atomic mutations**: every operation validates fully before it changes anything
//! 2. **Snapshot reads**: listings hold a read guard for their whole duration
//! 3. **Unique ids**: ids come from monotonic counters and are never reused
//! 4. **Referential integrity**: a group named as a source by another group cannot be deleted
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          HTTP query endpoint            │
//! ├─────────────────────────────────────────┤
//! │      ec2sim-server (dispatcher)         │
//! ├─────────────────────────────────────────┤
//! │  ec2sim-core  │  ec2sim-filter  │ ...   │
//! └─────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod permission;
pub mod resolve;
pub mod store;

// Re-export main types at crate root
pub use config::{RevokePolicy, StoreConfig};
pub use error::{Ec2Error, Ec2Result, ErrorCode, ErrorKind};
pub use ids::{GroupId, IdAllocator, InstanceId, ReservationId};
pub use model::{
    GroupRef, GroupSummary, Instance, InstanceStateChange, InstanceStateName, IpPermission,
    IpPermissionSpec, Reservation, RunInstancesParams, SecurityGroup, UserGroup, UserGroupRef,
};
pub use permission::{PermissionKey, PermissionSet, PermissionSources};
pub use store::{IntoShared, MatchAll, MatchWith, Matcher, ResourceStore, SharedStore};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use ec2sim_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RevokePolicy, StoreConfig};
    pub use crate::error::{Ec2Error, Ec2Result, ErrorCode, ErrorKind};
    pub use crate::ids::{GroupId, InstanceId, ReservationId};
    pub use crate::model::{
        GroupRef, Instance, InstanceStateName, IpPermission, IpPermissionSpec,
        RunInstancesParams, SecurityGroup, UserGroup, UserGroupRef,
    };
    pub use crate::store::{IntoShared, MatchAll, Matcher, ResourceStore, SharedStore};
}
