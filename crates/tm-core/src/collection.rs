use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::{CollectionError, ConflictGraphError, Result};
use crate::marker::{Event, Marker, MarkerKind};
use crate::ordering::{Cycle, OrderedMarkers};

/// Identity-keyed registry of markers.
///
/// `dangling_refs` maps an identity that is referenced by some present
/// explicit event, but is not itself present, to the set of events
/// referencing it. It is maintained on every mutation and never set
/// directly.
#[derive(Debug, Default)]
pub struct Collection {
    items: HashMap<Uuid, Marker>,
    dangling_refs: HashMap<Uuid, HashSet<Uuid>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection through the regular add path.
    pub fn from_markers(markers: impl IntoIterator<Item = Marker>) -> Result<Self> {
        let mut collection = Self::new();
        collection.add_items(markers)?;
        Ok(collection)
    }

    pub fn add_item(&mut self, marker: impl Into<Marker>) -> Result<()> {
        self.add_items([marker.into()])
    }

    /// Add a batch of markers.
    ///
    /// Every marker is identity-checked and inserted first; reference
    /// bookkeeping runs afterwards so that events may refer to each other
    /// within one batch. A duplicate identity stops the batch: markers before
    /// it stay in the collection (with their bookkeeping done), the duplicate
    /// and everything after it are not added.
    pub fn add_items(&mut self, markers: impl IntoIterator<Item = Marker>) -> Result<()> {
        let mut added = Vec::new();
        let mut outcome = Ok(());
        for marker in markers {
            let id = marker.id();
            if self.items.contains_key(&id) {
                outcome = Err(CollectionError::DuplicateIdentity(id));
                break;
            }
            self.items.insert(id, marker);
            added.push(id);
        }
        for id in added {
            self.dangling_refs.remove(&id);
            self.track_outgoing(id);
        }
        outcome
    }

    /// Replace the marker stored under `id` with one of the same variant.
    pub fn update_item(&mut self, id: Uuid, marker: impl Into<Marker>) -> Result<()> {
        let marker = marker.into();
        let existing = self.get_item(&id)?;
        if existing.kind() != marker.kind() {
            return Err(CollectionError::VariantMismatch {
                id,
                expected: existing.kind(),
                found: marker.kind(),
            });
        }
        if marker.id() != id {
            return Err(CollectionError::IdentityMismatch {
                id,
                found: marker.id(),
            });
        }
        self.items.insert(id, marker);

        // Drop every reference the old marker contributed, then re-derive
        // from the replacement.
        self.dangling_refs.retain(|_, referrers| {
            referrers.remove(&id);
            !referrers.is_empty()
        });
        self.track_outgoing(id);
        Ok(())
    }

    fn track_outgoing(&mut self, id: Uuid) {
        let Some(relations) = self.items.get(&id).and_then(Marker::relations) else {
            return;
        };
        for target in relations.referenced() {
            if !self.items.contains_key(target) {
                self.dangling_refs.entry(*target).or_default().insert(id);
            }
        }
    }

    pub fn get_item(&self, id: &Uuid) -> Result<&Marker> {
        self.items.get(id).ok_or(CollectionError::NotFound(*id))
    }

    pub fn get_event(&self, id: &Uuid) -> Result<&Event> {
        let marker = self.get_item(id)?;
        marker
            .as_event()
            .ok_or_else(|| CollectionError::VariantMismatch {
                id: *id,
                expected: MarkerKind::Event,
                found: marker.kind(),
            })
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.items.contains_key(id)
    }

    /// All known identities, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &Uuid> {
        self.items.keys()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when every explicit reference points at a present marker.
    pub fn is_self_contained(&self) -> bool {
        self.dangling_refs.is_empty()
    }

    /// Missing identity → events that reference it.
    pub fn dangling_refs(&self) -> &HashMap<Uuid, HashSet<Uuid>> {
        &self.dangling_refs
    }

    /// Build the ordering graph over the current state and list its cycles.
    pub fn conflicts(&self) -> std::result::Result<Vec<Cycle>, ConflictGraphError> {
        OrderedMarkers::build(self).cycles()
    }

    /// False when the relations contradict each other, or when that cannot
    /// be ruled out.
    pub fn has_no_conflict(&self) -> bool {
        self.conflicts().is_ok_and(|cycles| cycles.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{Date, Relations, TimeSpec};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn explicit(rel: Relations) -> Event {
        Event::new("event", TimeSpec::Explicit(rel))
    }

    #[test]
    fn test_add_and_get() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        let id = d.id();
        c.add_item(d.clone()).unwrap();
        assert_eq!(c.get_item(&id).unwrap(), &Marker::Date(d));
        assert_eq!(c.len(), 1);
        assert!(c.is_self_contained());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        c.add_item(d.clone()).unwrap();
        let err = c.add_item(d.clone()).unwrap_err();
        assert_eq!(err, CollectionError::DuplicateIdentity(d.id()));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_partial_batch_keeps_earlier_items() {
        let mut c = Collection::new();
        let existing = date(2020, 1, 1);
        c.add_item(existing.clone()).unwrap();

        let missing = Uuid::new_v4();
        let first = explicit(Relations::new().before(missing));
        let first_id = first.id();
        let after_dup = date(2021, 1, 1);
        let after_dup_id = after_dup.id();

        let err = c
            .add_items([first.into(), existing.clone().into(), after_dup.into()])
            .unwrap_err();
        assert_eq!(err, CollectionError::DuplicateIdentity(existing.id()));
        assert!(c.contains(&first_id));
        assert!(!c.contains(&after_dup_id));
        // Bookkeeping still ran for the item that made it in.
        assert!(c.dangling_refs()[&missing].contains(&first_id));
    }

    #[test]
    fn test_dangling_resolved_by_later_add() {
        let mut c = Collection::new();
        let target = date(2020, 5, 5);
        let e = explicit(Relations::new().after(target.id()));
        c.add_item(e).unwrap();
        assert!(!c.is_self_contained());
        assert!(c.dangling_refs().contains_key(&target.id()));

        c.add_item(target).unwrap();
        assert!(c.is_self_contained());
    }

    #[test]
    fn test_batch_forward_refs_are_not_dangling() {
        let a = explicit(Relations::new());
        let b = explicit(Relations::new().same(a.id()));
        // b listed first: its target arrives later in the same batch.
        let c = Collection::from_markers([b.into(), a.into()]).unwrap();
        assert!(c.is_self_contained());
    }

    #[test]
    fn test_update_not_found() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        let err = c.update_item(d.id(), d.clone()).unwrap_err();
        assert_eq!(err, CollectionError::NotFound(d.id()));
    }

    #[test]
    fn test_update_variant_mismatch_leaves_marker() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        let id = d.id();
        c.add_item(d.clone()).unwrap();
        let e = Event::with_id(id, "x", TimeSpec::Explicit(Relations::new()));
        let err = c.update_item(id, e).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::VariantMismatch {
                expected: MarkerKind::Date,
                found: MarkerKind::Event,
                ..
            }
        ));
        assert_eq!(c.get_item(&id).unwrap(), &Marker::Date(d));
    }

    #[test]
    fn test_update_identity_mismatch() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        let id = d.id();
        c.add_item(d).unwrap();
        let err = c.update_item(id, date(2020, 1, 2)).unwrap_err();
        assert!(matches!(err, CollectionError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_update_rederives_dangling() {
        let mut c = Collection::new();
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let e = explicit(Relations::new().before(x));
        let id = e.id();
        c.add_item(e).unwrap();
        assert!(c.dangling_refs().contains_key(&x));

        let replacement =
            Event::with_id(id, "event", TimeSpec::Explicit(Relations::new().before(y)));
        c.update_item(id, replacement).unwrap();
        assert!(!c.dangling_refs().contains_key(&x));
        assert!(c.dangling_refs()[&y].contains(&id));
    }

    #[test]
    fn test_update_keeps_other_referrers() {
        let mut c = Collection::new();
        let x = Uuid::new_v4();
        let a = explicit(Relations::new().before(x));
        let b = explicit(Relations::new().after(x));
        let (a_id, b_id) = (a.id(), b.id());
        c.add_items([a.into(), b.into()]).unwrap();

        c.update_item(a_id, Event::with_id(a_id, "a", TimeSpec::Explicit(Relations::new())))
            .unwrap();
        assert_eq!(c.dangling_refs()[&x], HashSet::from([b_id]));
    }

    #[test]
    fn test_get_event() {
        let mut c = Collection::new();
        let d = date(2020, 1, 1);
        let e = explicit(Relations::new());
        let (d_id, e_id) = (d.id(), e.id());
        c.add_items([d.into(), e.into()]).unwrap();
        assert_eq!(c.get_event(&e_id).unwrap().id(), e_id);
        assert!(matches!(
            c.get_event(&d_id),
            Err(CollectionError::VariantMismatch { .. })
        ));
        assert!(matches!(
            c.get_event(&Uuid::new_v4()),
            Err(CollectionError::NotFound(_))
        ));
    }

    #[test]
    fn test_list() {
        let a = date(2020, 1, 1);
        let b = date(2020, 1, 2);
        let expected = HashSet::from([a.id(), b.id()]);
        let c = Collection::from_markers([a.into(), b.into()]).unwrap();
        let listed: HashSet<Uuid> = c.list().copied().collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_empty_collection_has_no_conflict() {
        let c = Collection::new();
        assert!(c.has_no_conflict());
        assert!(c.conflicts().unwrap().is_empty());
    }
}
