//! The attribute abstraction behind every filter predicate.
//!
//! An [`Attribute`] is one named, filterable property of an entity kind.
//! Each entity kind enumerates its attributes in an enum implementing this
//! trait (see [`builtin`](crate::builtin)); a
//! [`CompiledFilter`](crate::compiled::CompiledFilter) is generic over it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};

/// How raw filter values for an attribute are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Compared as exact strings.
    Text,
    /// Parsed as a decimal integer and compared numerically.
    Integer,
}

/// A filter value after interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

impl FilterValue {
    /// Interpret a raw value according to `kind`.
    pub fn parse(attribute: &'static str, kind: ValueKind, raw: &str) -> FilterResult<Self> {
        match kind {
            ValueKind::Text => Ok(FilterValue::Text(raw.to_string())),
            ValueKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FilterValue::Integer)
                .map_err(|e| FilterError::InvalidValue {
                    attribute,
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// The value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            FilterValue::Integer(_) => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(n) => Some(*n),
            FilterValue::Text(_) => None,
        }
    }

    /// Whether this is the text value `s`.
    pub fn is_text(&self, s: &str) -> bool {
        self.as_text() == Some(s)
    }

    /// Whether this is the integer value `n`.
    pub fn is_integer(&self, n: i64) -> bool {
        self.as_integer() == Some(n)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// A filterable property of some entity kind.
///
/// # Implementing an Attribute
///
/// ```
/// use ec2sim_filter::{Attribute, FilterValue};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum ColourAttribute {
///     Colour,
/// }
///
/// struct Widget {
///     colour: String,
/// }
///
/// impl Attribute for ColourAttribute {
///     type Target = Widget;
///     const KIND: &'static str = "widgets";
///
///     fn all() -> &'static [Self] {
///         &[ColourAttribute::Colour]
///     }
///
///     fn name(&self) -> &'static str {
///         "colour"
///     }
///
///     fn matches(&self, widget: &Widget, value: &FilterValue) -> bool {
///         value.is_text(&widget.colour)
///     }
/// }
///
/// assert_eq!(ColourAttribute::parse("colour"), Some(ColourAttribute::Colour));
/// ```
pub trait Attribute: Copy + fmt::Debug + Send + Sync + 'static {
    /// The entity this attribute is read from.
    type Target;

    /// Plural name of the entity kind, for error messages.
    const KIND: &'static str;

    /// Every attribute of this kind.
    fn all() -> &'static [Self];

    /// The predicate name clients use.
    fn name(&self) -> &'static str;

    /// How values for this attribute are interpreted.
    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    /// Whether `target` matches one interpreted value.
    fn matches(&self, target: &Self::Target, value: &FilterValue) -> bool;

    /// Look an attribute up by predicate name.
    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|attr| attr.name() == name)
    }

    /// Every predicate name of this kind.
    fn names() -> Vec<&'static str> {
        Self::all().iter().map(|attr| attr.name()).collect()
    }
}
