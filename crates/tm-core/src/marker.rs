use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{TimePoint, TimeRelativity};

/// An absolute date and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteDateTime {
    id: Uuid,
    pub at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AbsoluteDateTime {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self::with_id(Uuid::new_v4(), at)
    }

    pub fn with_id(id: Uuid, at: DateTime<FixedOffset>) -> Self {
        Self {
            id,
            at,
            label: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// A bare calendar date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Date {
    pub fn new(date: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), date)
    }

    pub fn with_id(id: Uuid, date: NaiveDate) -> Self {
        Self {
            id,
            date,
            label: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Identities an explicit event is asserted to precede, coincide with, or follow.
///
/// These are forward references: any of them may name a marker that is not
/// (yet) in the collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    #[serde(default)]
    pub befores: BTreeSet<Uuid>,
    #[serde(default)]
    pub sames: BTreeSet<Uuid>,
    #[serde(default)]
    pub afters: BTreeSet<Uuid>,
}

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, id: Uuid) -> Self {
        self.befores.insert(id);
        self
    }

    pub fn same(mut self, id: Uuid) -> Self {
        self.sames.insert(id);
        self
    }

    pub fn after(mut self, id: Uuid) -> Self {
        self.afters.insert(id);
        self
    }

    /// Every identity named by any of the three sets.
    pub fn referenced(&self) -> impl Iterator<Item = &Uuid> {
        self.befores
            .iter()
            .chain(self.sames.iter())
            .chain(self.afters.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.befores.is_empty() && self.sames.is_empty() && self.afters.is_empty()
    }
}

/// Where an event sits in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSpec {
    /// Placement known by value.
    Implicit(TimePoint),
    /// Placement known only relative to other markers.
    Explicit(Relations),
}

impl TimeSpec {
    pub fn relations(&self) -> Option<&Relations> {
        match self {
            TimeSpec::Explicit(rel) => Some(rel),
            TimeSpec::Implicit(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timespec: TimeSpec,
}

impl Event {
    pub fn new(name: impl Into<String>, timespec: TimeSpec) -> Self {
        Self::with_id(Uuid::new_v4(), name, timespec)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, timespec: TimeSpec) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            timespec,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    AbsoluteDateTime,
    Date,
    Event,
}

impl MarkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKind::AbsoluteDateTime => "absolute_date_time",
            MarkerKind::Date => "date",
            MarkerKind::Event => "event",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any record stored in a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    AbsoluteDateTime(AbsoluteDateTime),
    Date(Date),
    Event(Event),
}

impl Marker {
    pub fn id(&self) -> Uuid {
        match self {
            Marker::AbsoluteDateTime(m) => m.id(),
            Marker::Date(m) => m.id(),
            Marker::Event(m) => m.id(),
        }
    }

    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::AbsoluteDateTime(_) => MarkerKind::AbsoluteDateTime,
            Marker::Date(_) => MarkerKind::Date,
            Marker::Event(_) => MarkerKind::Event,
        }
    }

    /// The value this marker can be ordered by, if it has one.
    /// Explicit events have none.
    pub fn time_point(&self) -> Option<TimePoint> {
        match self {
            Marker::AbsoluteDateTime(m) => Some(TimePoint::Instant(m.at)),
            Marker::Date(m) => Some(TimePoint::Day(m.date)),
            Marker::Event(e) => match &e.timespec {
                TimeSpec::Implicit(point) => Some(*point),
                TimeSpec::Explicit(_) => None,
            },
        }
    }

    /// Compare by value. `Unknown` when either side has no value.
    pub fn compare(&self, other: &Marker) -> TimeRelativity {
        match (self.time_point(), other.time_point()) {
            (Some(a), Some(b)) => a.compare(&b),
            _ => TimeRelativity::Unknown,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Marker::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Relations asserted by this marker, for explicit events only.
    pub fn relations(&self) -> Option<&Relations> {
        self.as_event().and_then(|e| e.timespec.relations())
    }

    /// One-line human description.
    pub fn summary(&self) -> String {
        match self {
            Marker::AbsoluteDateTime(m) => with_label(m.at.to_rfc3339(), m.label.as_deref()),
            Marker::Date(m) => with_label(m.date.to_string(), m.label.as_deref()),
            Marker::Event(e) => match &e.timespec {
                TimeSpec::Implicit(point) => format!("{} @ {point}", e.name),
                TimeSpec::Explicit(rel) => format!(
                    "{} (before {}, same {}, after {})",
                    e.name,
                    rel.befores.len(),
                    rel.sames.len(),
                    rel.afters.len()
                ),
            },
        }
    }
}

fn with_label(value: String, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{value} {label}"),
        None => value,
    }
}

impl From<AbsoluteDateTime> for Marker {
    fn from(m: AbsoluteDateTime) -> Self {
        Marker::AbsoluteDateTime(m)
    }
}

impl From<Date> for Marker {
    fn from(m: Date) -> Self {
        Marker::Date(m)
    }
}

impl From<Event> for Marker {
    fn from(m: Event) -> Self {
        Marker::Event(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Date::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let b = Date::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_kind() {
        let m: Marker = AbsoluteDateTime::new(at("2021-04-17T10:46:34+01:00")).into();
        assert_eq!(m.kind(), MarkerKind::AbsoluteDateTime);
        let e: Marker = Event::new("x", TimeSpec::Explicit(Relations::new())).into();
        assert_eq!(e.kind(), MarkerKind::Event);
        assert_eq!(e.kind().as_str(), "event");
    }

    #[test]
    fn test_explicit_event_has_no_time_point() {
        let e: Marker = Event::new("x", TimeSpec::Explicit(Relations::new())).into();
        assert!(e.time_point().is_none());
        let d: Marker = Date::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).into();
        assert_eq!(e.compare(&d), TimeRelativity::Unknown);
    }

    #[test]
    fn test_implicit_event_compares_with_date() {
        let e: Marker = Event::new(
            "launch",
            TimeSpec::Implicit(TimePoint::Instant(at("2020-01-01T09:00:00Z"))),
        )
        .into();
        let d: Marker = Date::new(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()).into();
        assert_eq!(e.compare(&d), TimeRelativity::Before);
        assert_eq!(d.compare(&e), TimeRelativity::After);
    }

    #[test]
    fn test_relations_referenced() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rel = Relations::new().before(a).same(b).after(c).after(a);
        let refs: BTreeSet<Uuid> = rel.referenced().copied().collect();
        assert_eq!(refs, BTreeSet::from([a, b, c]));
        assert!(!rel.is_empty());
        assert!(Relations::new().is_empty());
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let e = Event::new(
            "moved house",
            TimeSpec::Explicit(Relations::new().after(Uuid::new_v4())),
        )
        .described("the second time");
        let json = serde_json::to_string(&e).unwrap();
        let e2: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(e, e2);
    }

    #[test]
    fn test_summary() {
        let d: Marker = Date::new(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())
            .labelled("leap")
            .into();
        assert_eq!(d.summary(), "2020-02-29 leap");
    }
}
