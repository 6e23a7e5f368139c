//! Filter predicates attached to a channel rule.
//!
//! A filter is either [`Filter::Unfiltered`] (everything passes) or an
//! explicit, non-empty [`Filter::AllowList`]. On the wire a filter is a JSON
//! array that may be absent; absent, `null` and `[]` all decode to
//! `Unfiltered`, so the empty-versus-missing ambiguity never reaches callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtoError, Result};

/// A value that can appear in a filter allow-list.
pub trait FilterMember: Clone + PartialEq {
    /// The value compared against incoming event attributes.
    fn as_str(&self) -> &str;

    /// Puts the members of an allow-list into their canonical order.
    ///
    /// The default keeps insertion order.
    fn arrange(_values: &mut Vec<Self>) {}
}

/// An allow-list filter over members of type `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<T> {
    /// No restriction: every value passes.
    Unfiltered,
    /// Only the listed values pass. Never empty, never contains duplicates.
    AllowList(Vec<T>),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self::Unfiltered
    }
}

impl<T: FilterMember> Filter<T> {
    /// Builds a filter from raw values, dropping duplicates.
    ///
    /// Two values are duplicates when they match the way [`Filter::allows`]
    /// matches: ignoring surrounding whitespace and ASCII case. The first
    /// spelling wins. An empty input yields [`Filter::Unfiltered`].
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let mut unique: Vec<T> = Vec::new();
        for value in values {
            if !unique.iter().any(|seen| same_member(seen, &value)) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            return Self::Unfiltered;
        }
        T::arrange(&mut unique);
        Self::AllowList(unique)
    }

    /// Returns true if this filter lets everything through.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        matches!(self, Self::Unfiltered)
    }

    /// Returns the allow-listed values (empty when unfiltered).
    #[must_use]
    pub fn values(&self) -> &[T] {
        match self {
            Self::Unfiltered => &[],
            Self::AllowList(values) => values,
        }
    }

    /// Returns true if `member` is explicitly allow-listed.
    #[must_use]
    pub fn contains(&self, member: &T) -> bool {
        self.values().contains(member)
    }

    /// Returns this filter with `member` added (`included`) or removed.
    ///
    /// Adding an existing member or removing an absent one is a no-op.
    /// Removing the last member turns the filter back into `Unfiltered`.
    #[must_use]
    pub fn toggle(&self, member: T, included: bool) -> Self {
        let mut values = self.values().to_vec();
        if included {
            if !values.contains(&member) {
                values.push(member);
            }
        } else {
            values.retain(|v| v != &member);
        }
        Self::from_values(values)
    }

    /// Returns true if `candidate` passes this filter.
    ///
    /// Comparison ignores surrounding whitespace and ASCII case.
    #[must_use]
    pub fn allows(&self, candidate: &str) -> bool {
        match self {
            Self::Unfiltered => true,
            Self::AllowList(values) => {
                let candidate = candidate.trim();
                values
                    .iter()
                    .any(|v| v.as_str().trim().eq_ignore_ascii_case(candidate))
            }
        }
    }
}

fn same_member<T: FilterMember>(a: &T, b: &T) -> bool {
    a.as_str().trim().eq_ignore_ascii_case(b.as_str().trim())
}

impl<T: Serialize> Serialize for Filter<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Unfiltered => serializer.collect_seq(std::iter::empty::<&T>()),
            Self::AllowList(values) => serializer.collect_seq(values),
        }
    }
}

impl<'de, T> Deserialize<'de> for Filter<T>
where
    T: FilterMember + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Option::<Vec<T>>::deserialize(deserializer)?;
        Ok(Self::from_values(values.unwrap_or_default()))
    }
}

/// Decodes a fixed enumeration member through its `FromStr`, so stored
/// values like `"Error"` are read the same way user input is.
fn deserialize_member<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = ProtoError>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Bugsnag severity levels, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unhandled or explicit errors.
    Error,
    /// Warnings.
    Warning,
    /// Informational events.
    Info,
}

impl Severity {
    /// Every severity, in enumeration order.
    pub const ALL: [Self; 3] = [Self::Error, Self::Warning, Self::Info];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl FilterMember for Severity {
    fn as_str(&self) -> &str {
        Self::as_str(self)
    }

    fn arrange(values: &mut Vec<Self>) {
        values.sort_unstable();
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProtoError::UnknownMember {
                kind: "severity",
                value: s.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_member(deserializer)
    }
}

/// Bugsnag webhook event kinds, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// An exception was reported.
    Exception,
    /// An error was reported.
    Error,
    /// The first occurrence of a new error.
    FirstException,
    /// A previously fixed error occurred again.
    Reopened,
    /// Error rate started spiking.
    SpikeStart,
    /// Error rate spike ended.
    SpikeEnd,
}

impl EventKind {
    /// Every event kind, in enumeration order.
    pub const ALL: [Self; 6] = [
        Self::Exception,
        Self::Error,
        Self::FirstException,
        Self::Reopened,
        Self::SpikeStart,
        Self::SpikeEnd,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exception => "exception",
            Self::Error => "error",
            Self::FirstException => "firstException",
            Self::Reopened => "reopened",
            Self::SpikeStart => "spikeStart",
            Self::SpikeEnd => "spikeEnd",
        }
    }
}

impl FilterMember for EventKind {
    fn as_str(&self) -> &str {
        Self::as_str(self)
    }

    fn arrange(values: &mut Vec<Self>) {
        values.sort_unstable();
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProtoError::UnknownMember {
                kind: "event",
                value: s.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_member(deserializer)
    }
}

/// A free-text release stage name such as `production`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(String);

impl Environment {
    /// Creates an environment name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl FilterMember for Environment {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses the comma-separated environment input of the rule editor.
///
/// Entries are trimmed, empty entries dropped and duplicates removed; the
/// order in which environments were typed is kept.
#[must_use]
pub fn parse_environments(input: &str) -> Filter<Environment> {
    Filter::from_values(
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Environment::new),
    )
}

/// Renders an environment filter back into its comma-separated form.
#[must_use]
pub fn format_environments(filter: &Filter<Environment>) -> String {
    filter
        .values()
        .iter()
        .map(Environment::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
