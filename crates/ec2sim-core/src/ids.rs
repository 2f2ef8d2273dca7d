//! Engine-generated identifiers.
//!
//! Ids are drawn from per-kind monotonic counters, so two concurrent
//! creations can never receive the same id and an id is never reused within
//! the lifetime of an allocator (a store reset keeps counting).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an id string as received from a client.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a security group (`sg-N`).
    GroupId
}

string_id! {
    /// Identifier of an instance (`i-N`).
    InstanceId
}

string_id! {
    /// Identifier of a reservation (`r-N`).
    ReservationId
}

/// Thread-safe allocator for every id kind.
#[derive(Debug, Default)]
pub struct IdAllocator {
    groups: AtomicU64,
    instances: AtomicU64,
    reservations: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose counters start at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh group id.
    pub fn next_group(&self) -> GroupId {
        GroupId(format!("sg-{}", Self::bump(&self.groups)))
    }

    /// Allocate a fresh instance id.
    pub fn next_instance(&self) -> InstanceId {
        InstanceId(format!("i-{}", Self::bump(&self.instances)))
    }

    /// Allocate a fresh reservation id.
    pub fn next_reservation(&self) -> ReservationId {
        ReservationId(format!("r-{}", Self::bump(&self.reservations)))
    }

    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed)
    }
}
