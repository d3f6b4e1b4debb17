//! Property tests over randomly shaped collections.

use std::collections::HashSet;

use proptest::prelude::*;
use tm_core::{Collection, Event, Marker, Relations, TimeSpec};
use uuid::Uuid;

/// `n` fresh identities plus, for each, a list of (kind, target index)
/// relations. Kind 0 = before, 1 = same, 2 = after. Targets may point past
/// the end, which makes them forward references to absent markers.
fn relation_plan() -> impl Strategy<Value = (usize, Vec<Vec<(u8, usize)>>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::collection::vec((0u8..3, 0..n + 3), 0..4), n),
        )
    })
}

fn build(n: usize, plan: &[Vec<(u8, usize)>]) -> (Vec<Uuid>, Vec<Marker>) {
    let ids: Vec<Uuid> = (0..n + 3).map(|_| Uuid::new_v4()).collect();
    let markers = plan
        .iter()
        .enumerate()
        .map(|(i, rels)| {
            let mut rel = Relations::new();
            for &(kind, target) in rels {
                rel = match kind {
                    0 => rel.before(ids[target]),
                    1 => rel.same(ids[target]),
                    _ => rel.after(ids[target]),
                };
            }
            Event::with_id(ids[i], "e", TimeSpec::Explicit(rel)).into()
        })
        .collect();
    (ids, markers)
}

proptest! {
    #[test]
    fn dangling_index_matches_definition((n, plan) in relation_plan()) {
        let (_, markers) = build(n, &plan);
        let coll = Collection::from_markers(markers).unwrap();

        let mut expected: HashSet<Uuid> = HashSet::new();
        for marker in coll.markers() {
            if let Some(rel) = marker.relations() {
                expected.extend(rel.referenced().filter(|id| !coll.contains(id)).copied());
            }
        }
        let actual: HashSet<Uuid> = coll.dangling_refs().keys().copied().collect();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(coll.is_self_contained(), expected.is_empty());
    }

    #[test]
    fn adding_missing_targets_makes_self_contained((n, plan) in relation_plan()) {
        let (ids, markers) = build(n, &plan);
        let mut coll = Collection::from_markers(markers).unwrap();
        for id in &ids[n..] {
            if coll.dangling_refs().contains_key(id) {
                coll.add_item(Event::with_id(*id, "late", TimeSpec::Explicit(Relations::new())))
                    .unwrap();
            }
        }
        prop_assert!(coll.is_self_contained());
    }

    #[test]
    fn readding_any_identity_fails(
        (n, plan) in relation_plan(),
        pick in any::<prop::sample::Index>()
    ) {
        let (_, markers) = build(n, &plan);
        let victim = markers[pick.index(markers.len())].clone();
        let mut coll = Collection::from_markers(markers).unwrap();
        let count = coll.len();
        prop_assert!(coll.add_item(victim).is_err());
        prop_assert_eq!(coll.len(), count);
    }

    #[test]
    fn every_cycle_edge_exists((n, plan) in relation_plan()) {
        let (_, markers) = build(n, &plan);
        let coll = Collection::from_markers(markers).unwrap();
        let ordered = tm_core::OrderedMarkers::build(&coll);
        let cycles = ordered.cycles().unwrap();
        for cycle in &cycles {
            let unique: HashSet<&Uuid> = cycle.iter().collect();
            prop_assert_eq!(unique.len(), cycle.len());
            for (i, node) in cycle.iter().enumerate() {
                let next = &cycle[(i + 1) % cycle.len()];
                prop_assert!(ordered.has_edge(node, next));
            }
        }
        prop_assert_eq!(coll.has_no_conflict(), cycles.is_empty());
    }
}
