//! Built-in attribute vocabularies.
//!
//! This module provides the predicates the provider accepts for:
//!
//! - [`GroupAttribute`]: security group listings
//! - [`InstanceAttribute`]: instance listings

mod group;
mod instance;

pub use group::GroupAttribute;
pub use instance::InstanceAttribute;
