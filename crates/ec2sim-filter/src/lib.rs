//! ec2sim Filter Evaluator
//!
//! This crate decides which entities a describe-style listing returns. A
//! client sends a [`Filter`]: predicate names mapped to accepted values.
//!
//! # Matching Rules
//!
//! - Different predicates are combined with AND
//! - Values of one predicate are combined with OR
//! - An empty filter matches everything
//! - An unknown predicate is an error, never silently ignored
//!
//! # Built-in Vocabularies
//!
//! - [`GroupAttribute`]: `description`, `group-id`, `group-name`, `owner-id`,
//!   `ip-permission.*`
//! - [`InstanceAttribute`]: `instance-id`, `group-id`, `group-name`,
//!   `image-id`, `instance-state-*`, ...
//!
//! # Usage
//!
//! ```
//! use ec2sim_core::prelude::*;
//! use ec2sim_filter::{Filter, GroupFilter};
//!
//! let store = ResourceStore::new(StoreConfig::empty());
//! store.create_group("web", "front end").unwrap();
//! store.create_group("db", "back end").unwrap();
//!
//! let filter = GroupFilter::compile(&Filter::new().with("description", ["back end"])).unwrap();
//! let groups = store.list_groups(&[], &filter).unwrap();
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].name, "db");
//! ```

pub mod attribute;
pub mod builtin;
pub mod compiled;
pub mod error;
pub mod filter;

// Re-export main types
pub use attribute::{Attribute, FilterValue, ValueKind};
pub use compiled::{Clause, CompiledFilter, GroupFilter, InstanceFilter};
pub use error::{FilterError, FilterResult};
pub use filter::Filter;

// Re-export built-in vocabularies
pub use builtin::{GroupAttribute, InstanceAttribute};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::attribute::Attribute;
    pub use crate::compiled::{CompiledFilter, GroupFilter, InstanceFilter};
    pub use crate::error::{FilterError, FilterResult};
    pub use crate::filter::Filter;
    pub use crate::builtin::{GroupAttribute, InstanceAttribute};
}
