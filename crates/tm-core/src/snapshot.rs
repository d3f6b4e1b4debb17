//! JSON snapshot format.
//!
//! A snapshot is one object holding a `collection` array. Each entry pairs a
//! variant tag (`absolute_date_time`, `date`, `event`) with that variant's
//! payload under `data`:
//!
//! ```json
//! {"collection": [{"type": "date", "data": {"id": "…", "date": "2021-04-17"}}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::Collection;
use crate::error::SnapshotError;
use crate::marker::{AbsoluteDateTime, Date, Event, Marker, MarkerKind};

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct WireSnapshot {
    pub collection: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireEntry {
    #[serde(rename = "type")]
    pub tag: String,
    pub data: Value,
}

/// Known entry tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerTag {
    AbsoluteDateTime,
    Date,
    Event,
}

impl MarkerTag {
    pub fn parse(tag: &str) -> Result<Self, SnapshotError> {
        match tag {
            "absolute_date_time" => Ok(MarkerTag::AbsoluteDateTime),
            "date" => Ok(MarkerTag::Date),
            "event" => Ok(MarkerTag::Event),
            other => Err(SnapshotError::UnknownTag(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        self.kind().as_str()
    }

    fn kind(self) -> MarkerKind {
        match self {
            MarkerTag::AbsoluteDateTime => MarkerKind::AbsoluteDateTime,
            MarkerTag::Date => MarkerKind::Date,
            MarkerTag::Event => MarkerKind::Event,
        }
    }
}

impl From<MarkerKind> for MarkerTag {
    fn from(kind: MarkerKind) -> Self {
        match kind {
            MarkerKind::AbsoluteDateTime => MarkerTag::AbsoluteDateTime,
            MarkerKind::Date => MarkerTag::Date,
            MarkerKind::Event => MarkerTag::Event,
        }
    }
}

// --- Conversion: Wire → Domain ---

impl WireEntry {
    pub fn into_marker(self) -> Result<Marker, SnapshotError> {
        let tag = MarkerTag::parse(&self.tag)?;
        let payload = |source| SnapshotError::Payload {
            tag: tag.as_str(),
            source,
        };
        let marker = match tag {
            MarkerTag::AbsoluteDateTime => Marker::AbsoluteDateTime(
                serde_json::from_value::<AbsoluteDateTime>(self.data).map_err(payload)?,
            ),
            MarkerTag::Date => {
                Marker::Date(serde_json::from_value::<Date>(self.data).map_err(payload)?)
            }
            MarkerTag::Event => {
                Marker::Event(serde_json::from_value::<Event>(self.data).map_err(payload)?)
            }
        };
        Ok(marker)
    }

    pub fn from_marker(marker: &Marker) -> Result<Self, SnapshotError> {
        let tag = MarkerTag::from(marker.kind());
        let data = match marker {
            Marker::AbsoluteDateTime(m) => serde_json::to_value(m),
            Marker::Date(m) => serde_json::to_value(m),
            Marker::Event(m) => serde_json::to_value(m),
        }
        .map_err(|source| SnapshotError::Payload {
            tag: tag.as_str(),
            source,
        })?;
        Ok(WireEntry {
            tag: tag.as_str().to_string(),
            data,
        })
    }
}

impl WireSnapshot {
    /// Decode every entry, then seed a collection through its add path.
    pub fn into_collection(self) -> Result<Collection, SnapshotError> {
        let markers = self
            .collection
            .into_iter()
            .map(WireEntry::into_marker)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Collection::from_markers(markers)?)
    }

    pub fn from_collection(collection: &Collection) -> Result<Self, SnapshotError> {
        let mut markers: Vec<&Marker> = collection.markers().collect();
        markers.sort_by_key(|m| m.id());
        let entries = markers
            .into_iter()
            .map(WireEntry::from_marker)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WireSnapshot {
            collection: entries,
        })
    }
}

/// Deserialize a JSON snapshot into a collection.
pub fn import_json(json: &str) -> Result<Collection, SnapshotError> {
    let wire: WireSnapshot = serde_json::from_str(json)?;
    wire.into_collection()
}

/// Serialize a collection to a JSON snapshot.
pub fn export_json(collection: &Collection) -> Result<String, SnapshotError> {
    let wire = WireSnapshot::from_collection(collection)?;
    Ok(serde_json::to_string_pretty(&wire)?)
}
