use crate::types::{HotspotPoint, PointKind, Severity};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Either a specific value or the `all` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str("all"),
            Selector::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Selector<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Selector::All)
        } else {
            s.parse().map(Selector::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for Selector<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Selector<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

pub type SeveritySelector = Selector<Severity>;
pub type KindSelector = Selector<PointKind>;

/// The two map filter dropdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub severity: SeveritySelector,
    #[serde(default, rename = "type")]
    pub kind: KindSelector,
}

impl FilterState {
    pub fn admits(&self, point: &HotspotPoint) -> bool {
        self.severity.matches(&point.severity) && self.kind.matches(&point.kind)
    }

    pub fn visible<'a>(&self, points: &'a [HotspotPoint]) -> Vec<&'a HotspotPoint> {
        visible(points, self.severity, self.kind)
    }
}

/// Points that pass both selectors, in store order.
pub fn visible(
    points: &[HotspotPoint],
    severity: SeveritySelector,
    kind: KindSelector,
) -> Vec<&HotspotPoint> {
    points
        .iter()
        .filter(|p| severity.matches(&p.severity) && kind.matches(&p.kind))
        .collect()
}
