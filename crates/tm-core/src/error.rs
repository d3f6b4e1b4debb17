use std::fmt;

use uuid::Uuid;

use crate::marker::MarkerKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    DuplicateIdentity(Uuid),
    NotFound(Uuid),
    VariantMismatch {
        id: Uuid,
        expected: MarkerKind,
        found: MarkerKind,
    },
    /// A replacement marker carries a different identity than the slot it replaces.
    IdentityMismatch { id: Uuid, found: Uuid },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::DuplicateIdentity(id) => {
                write!(f, "duplicate identity: {id} already exists")
            }
            CollectionError::NotFound(id) => write!(f, "no marker with identity {id}"),
            CollectionError::VariantMismatch {
                id,
                expected,
                found,
            } => write!(f, "marker {id} is a {found}, expected a {expected}"),
            CollectionError::IdentityMismatch { id, found } => {
                write!(f, "replacement for {id} carries identity {found}")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

/// The ordering graph could not be fully analysed.
///
/// Callers asking a yes/no question treat this as "conflicting".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictGraphError {
    CycleLimitExceeded { limit: usize },
}

impl fmt::Display for ConflictGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictGraphError::CycleLimitExceeded { limit } => {
                write!(f, "more than {limit} conflict cycles; enumeration stopped")
            }
        }
    }
}

impl std::error::Error for ConflictGraphError {}

/// Snapshot decode/encode failures.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnknownTag(String),
    Payload {
        tag: &'static str,
        source: serde_json::Error,
    },
    Collection(CollectionError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "invalid snapshot JSON: {e}"),
            SnapshotError::UnknownTag(tag) => {
                write!(f, "snapshot with unexpected schema: unknown type {tag:?}")
            }
            SnapshotError::Payload { tag, source } => {
                write!(f, "invalid {tag} payload: {source}")
            }
            SnapshotError::Collection(e) => write!(f, "inconsistent snapshot: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            SnapshotError::Payload { source, .. } => Some(source),
            SnapshotError::Collection(e) => Some(e),
            SnapshotError::UnknownTag(_) => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

impl From<CollectionError> for SnapshotError {
    fn from(e: CollectionError) -> Self {
        SnapshotError::Collection(e)
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;
