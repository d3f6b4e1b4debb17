//! Temporal marker store engine.
//!
//! Holds absolute date-times, dates, and events whose time is either known
//! by value or only asserted relative to other markers ("before", "same",
//! "after"). The collection keeps identities unique and tracks references to
//! markers it does not hold yet; the ordering graph turns all asserted and
//! value-derived relations into one directed graph whose cycles are
//! contradictions.
//!
//! Zero I/O — persistence lives in `tm-store`.

pub mod collection;
pub mod constants;
pub mod error;
pub mod marker;
pub mod ordering;
pub mod snapshot;
pub mod time;
pub mod union_find;

pub use collection::Collection;
pub use constants::MAX_CYCLES;
pub use error::{CollectionError, ConflictGraphError, SnapshotError};
pub use marker::{AbsoluteDateTime, Date, Event, Marker, MarkerKind, Relations, TimeSpec};
pub use ordering::{Cycle, Digraph, OrderedMarkers};
pub use snapshot::{MarkerTag, export_json, import_json};
pub use time::{TimePoint, TimeRelativity};
pub use union_find::UnionFind;
