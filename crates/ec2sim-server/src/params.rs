//! Query-protocol parameters.
//!
//! The provider's query protocol flattens lists into numbered keys:
//! `GroupName.1`, `Filter.2.Value.1`, `IpPermissions.1.IpRanges.3.CidrIp`.
//! [`QueryParams`] keeps the raw pairs and [`split_indexed`] regroups them by
//! index, one level at a time.

use std::collections::BTreeMap;

use ec2sim_core::{Ec2Error, Ec2Result, ErrorCode};
use ec2sim_filter::Filter;

/// Entries sharing one list index, as `(rest-of-key, value)` pairs.
pub type IndexedEntries<'a> = Vec<(&'a str, &'a str)>;

/// Decoded request parameters, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the URL query string and a form-encoded body.
    ///
    /// Query-string pairs come first.
    pub fn parse(query: Option<&str>, body: &[u8]) -> Ec2Result<Self> {
        let mut pairs: Vec<(String, String)> = match query {
            Some(query) => serde_urlencoded::from_str(query).map_err(malformed_encoding)?,
            None => Vec::new(),
        };
        if !body.is_empty() {
            let form: Vec<(String, String)> =
                serde_urlencoded::from_bytes(body).map_err(malformed_encoding)?;
            pairs.extend(form);
        }
        Ok(Self { pairs })
    }

    /// Append a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value of a parameter, which must be present.
    pub fn require(&self, key: &str) -> Ec2Result<&str> {
        self.get(key)
            .ok_or_else(|| Ec2Error::invalid_parameter(format!("missing parameter {}", key)))
    }

    /// Parse an optional integer parameter.
    pub fn integer<T: std::str::FromStr>(&self, key: &str) -> Ec2Result<Option<T>> {
        self.get(key).map(|raw| parse_integer(key, raw)).transpose()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Entries under `prefix.N`, grouped by `N`.
    pub fn indexed(&self, prefix: &str) -> Ec2Result<BTreeMap<u64, IndexedEntries<'_>>> {
        let entries: Vec<(&str, &str)> = self
            .pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        split_indexed(&entries, prefix)
    }

    /// Values of the flat list `prefix.N`, ordered by index.
    pub fn list(&self, prefix: &str) -> Ec2Result<Vec<String>> {
        let mut values = Vec::new();
        for (index, entries) in self.indexed(prefix)? {
            for (rest, value) in entries {
                if !rest.is_empty() {
                    return Err(unknown_parameter(&format!("{}.{}.{}", prefix, index, rest)));
                }
                values.push(value.to_string());
            }
        }
        Ok(values)
    }

    /// The `Filter.N.Name` / `Filter.N.Value.M` predicates of a request.
    pub fn filter(&self) -> Ec2Result<Filter> {
        let mut filter = Filter::new();
        for (index, entries) in self.indexed("Filter")? {
            let mut name = None;
            let mut value_entries = Vec::new();
            for (rest, value) in entries {
                if rest == "Name" {
                    name = Some(value);
                } else if rest.starts_with("Value.") {
                    value_entries.push((rest, value));
                } else {
                    return Err(unknown_parameter(&format!("Filter.{}.{}", index, rest)));
                }
            }
            let name = name.ok_or_else(|| {
                Ec2Error::invalid_parameter(format!("Filter.{}.Name is required", index))
            })?;
            let values: Vec<&str> = split_indexed(&value_entries, "Value")?
                .into_values()
                .flatten()
                .map(|(_, value)| value)
                .collect();
            filter.add(name, values);
        }
        Ok(filter)
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for QueryParams {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }
}

/// Group `entries` whose key is `prefix.N[.rest]` by `N`.
///
/// Keys outside `prefix` are skipped. Indices need not be contiguous or
/// ordered; a non-numeric index is an unknown parameter.
pub fn split_indexed<'a>(
    entries: &[(&'a str, &'a str)],
    prefix: &str,
) -> Ec2Result<BTreeMap<u64, IndexedEntries<'a>>> {
    let mut grouped: BTreeMap<u64, IndexedEntries<'a>> = BTreeMap::new();
    for &(key, value) in entries {
        let Some(tail) = key
            .strip_prefix(prefix)
            .and_then(|tail| tail.strip_prefix('.'))
        else {
            continue;
        };
        let (index, rest) = tail.split_once('.').unwrap_or((tail, ""));
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown_parameter(key));
        }
        let index: u64 = index.parse().map_err(|_| unknown_parameter(key))?;
        grouped.entry(index).or_default().push((rest, value));
    }
    Ok(grouped)
}

/// Parse an integer parameter, failing `InvalidParameterValue`.
pub fn parse_integer<T: std::str::FromStr>(key: &str, raw: &str) -> Ec2Result<T> {
    raw.trim().parse().map_err(|_| {
        Ec2Error::invalid_parameter(format!("invalid value {:?} for {}", raw, key))
    })
}

pub(crate) fn unknown_parameter(key: &str) -> Ec2Error {
    Ec2Error::new(
        ErrorCode::UnknownParameter,
        format!("The parameter {} is not recognized", key),
    )
}

fn malformed_encoding(err: serde_urlencoded::de::Error) -> Ec2Error {
    Ec2Error::invalid_parameter(format!("malformed request encoding: {}", err))
}
