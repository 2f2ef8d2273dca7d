//! Raw, uninterpreted filters as a client sends them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A mapping from predicate name to accepted values.
///
/// Predicates are conjunctive; values of one predicate are disjunctive.
/// Adding the same predicate twice merges the value lists.
///
/// # Example
///
/// ```
/// use ec2sim_filter::Filter;
///
/// let mut filter = Filter::new();
/// filter.add("group-name", ["web", "db"]);
/// filter.add("image-id", ["ami-1"]);
///
/// assert_eq!(filter.len(), 2);
/// assert_eq!(filter.values("group-name"), Some(&["web".to_string(), "db".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    predicates: BTreeMap<String, Vec<String>>,
}

impl Filter {
    /// Create an empty filter, which matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add values for a predicate.
    pub fn add<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.predicates
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Builder form of [`add`](Self::add).
    pub fn with<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.add(name, values);
        self
    }

    /// Values given for a predicate.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.predicates.get(name).map(Vec::as_slice)
    }

    /// Number of distinct predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Iterate over predicates in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.predicates
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Combine two filters into their conjunction.
    pub fn merge(mut self, other: Filter) -> Self {
        for (name, values) in other.predicates {
            self.add(name, values);
        }
        self
    }
}

impl<N, V> FromIterator<(N, V)> for Filter
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut filter = Filter::new();
        for (name, value) in iter {
            filter.add(name, [value]);
        }
        filter
    }
}
