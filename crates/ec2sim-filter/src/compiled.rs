//! Compiled filters.
//!
//! This module provides [`CompiledFilter`], a [`Filter`] whose predicate
//! names have been resolved against one entity kind's attribute vocabulary
//! and whose values have been interpreted. Compilation is where unknown
//! predicates and unparsable values are rejected, so evaluation can never
//! fail.

use ec2sim_core::Matcher;
use tracing::debug;

use crate::attribute::{Attribute, FilterValue};
use crate::builtin::{GroupAttribute, InstanceAttribute};
use crate::error::{FilterError, FilterResult};
use crate::filter::Filter;

/// One predicate: an attribute and the values any of which may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause<A> {
    pub attribute: A,
    pub values: Vec<FilterValue>,
}

impl<A: Attribute> Clause<A> {
    /// Whether `target` matches at least one value.
    pub fn matches(&self, target: &A::Target) -> bool {
        self.values
            .iter()
            .any(|value| self.attribute.matches(target, value))
    }
}

/// A filter ready to be evaluated against entities of one kind.
///
/// # Example
///
/// ```
/// use ec2sim_filter::{Filter, GroupFilter};
///
/// let filter = Filter::new().with("ip-permission.from-port", ["200"]);
/// let compiled = GroupFilter::compile(&filter).unwrap();
/// assert_eq!(compiled.len(), 1);
///
/// let bad = Filter::new().with("colour", ["blue"]);
/// assert!(GroupFilter::compile(&bad).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter<A> {
    clauses: Vec<Clause<A>>,
}

impl<A: Attribute> CompiledFilter<A> {
    /// A filter with no clauses, which matches everything.
    pub fn match_all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Resolve and interpret every predicate of `filter`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown predicate name, a predicate with no values, or a
    /// value the attribute cannot interpret.
    pub fn compile(filter: &Filter) -> FilterResult<Self> {
        let mut clauses = Vec::with_capacity(filter.len());
        for (name, raw_values) in filter.iter() {
            let attribute = A::parse(name).ok_or_else(|| FilterError::UnknownAttribute {
                kind: A::KIND,
                name: name.to_string(),
            })?;
            if raw_values.is_empty() {
                return Err(FilterError::EmptyValues(name.to_string()));
            }
            let values = raw_values
                .iter()
                .map(|raw| FilterValue::parse(attribute.name(), attribute.value_kind(), raw))
                .collect::<FilterResult<Vec<_>>>()?;
            clauses.push(Clause { attribute, values });
        }
        debug!(kind = A::KIND, clauses = clauses.len(), "Compiled filter");
        Ok(Self { clauses })
    }

    /// Whether `target` satisfies every clause.
    pub fn matches(&self, target: &A::Target) -> bool {
        self.clauses.iter().all(|clause| clause.matches(target))
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl<A: Attribute> Default for CompiledFilter<A> {
    fn default() -> Self {
        Self::match_all()
    }
}

impl<A: Attribute> Matcher<A::Target> for CompiledFilter<A> {
    fn matches(&self, candidate: &A::Target) -> bool {
        CompiledFilter::matches(self, candidate)
    }
}

/// A compiled filter over security groups.
pub type GroupFilter = CompiledFilter<GroupAttribute>;

/// A compiled filter over instances.
pub type InstanceFilter = CompiledFilter<InstanceAttribute>;
