//! Ordering graph over a collection, and conflict detection on it.
//!
//! The graph is rebuilt from scratch for every query:
//!
//! 1. events asserted `same` are merged into groups (union-find), each group
//!    represented by its smallest identity;
//! 2. every pair of value-comparable markers contributes an edge from the
//!    earlier to the later one, between their group representatives;
//! 3. explicit `befores`/`afters` contribute edges between group
//!    representatives. Referenced identities missing from the collection
//!    appear as placeholder nodes;
//! 4. every simple cycle is a conflict.
//!
//! Cycles are enumerated with Johnson's algorithm. Both the circuit search
//! and the strongly-connected-component pass are iterative.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use uuid::Uuid;

use crate::collection::Collection;
use crate::constants::MAX_CYCLES;
use crate::error::ConflictGraphError;
use crate::marker::Marker;
use crate::time::TimeRelativity;
use crate::union_find::UnionFind;

/// Node identities along a cycle, in edge order. The last node has an edge
/// back to the first.
pub type Cycle = Vec<Uuid>;

/// Directed graph keyed by identity. Parallel edges collapse.
#[derive(Debug, Default, Clone)]
pub struct Digraph {
    adj: BTreeMap<Uuid, BTreeSet<Uuid>>,
}

impl Digraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Uuid) {
        self.adj.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: Uuid, to: Uuid) {
        self.add_node(to);
        self.adj.entry(from).or_default().insert(to);
    }

    pub fn has_edge(&self, from: &Uuid, to: &Uuid) -> bool {
        self.adj.get(from).is_some_and(|out| out.contains(to))
    }

    pub fn contains(&self, node: &Uuid) -> bool {
        self.adj.contains_key(node)
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.values().map(BTreeSet::len).sum()
    }

    fn successors(&self, node: &Uuid) -> impl DoubleEndedIterator<Item = &Uuid> {
        self.adj.get(node).into_iter().flatten()
    }

    /// Induced subgraph on `nodes`.
    fn subgraph(&self, nodes: &BTreeSet<Uuid>) -> Digraph {
        let adj = nodes
            .iter()
            .map(|n| {
                let out = self
                    .successors(n)
                    .filter(|m| nodes.contains(m))
                    .copied()
                    .collect();
                (*n, out)
            })
            .collect();
        Digraph { adj }
    }

    /// Strongly connected components (Tarjan), iterative.
    pub fn strongly_connected_components(&self) -> Vec<BTreeSet<Uuid>> {
        let mut index: HashMap<Uuid, usize> = HashMap::new();
        let mut lowlink: HashMap<Uuid, usize> = HashMap::new();
        let mut on_stack: BTreeSet<Uuid> = BTreeSet::new();
        let mut stack: Vec<Uuid> = Vec::new();
        let mut components = Vec::new();
        let mut next_index = 0usize;

        for &root in self.adj.keys() {
            if index.contains_key(&root) {
                continue;
            }
            // (node, successors not yet visited from it)
            let mut work: Vec<(Uuid, Vec<Uuid>)> = Vec::new();
            index.insert(root, next_index);
            lowlink.insert(root, next_index);
            next_index += 1;
            stack.push(root);
            on_stack.insert(root);
            work.push((root, self.successors(&root).rev().copied().collect()));

            while let Some((node, pending)) = work.last_mut() {
                let node = *node;
                if let Some(next) = pending.pop() {
                    if !index.contains_key(&next) {
                        index.insert(next, next_index);
                        lowlink.insert(next, next_index);
                        next_index += 1;
                        stack.push(next);
                        on_stack.insert(next);
                        work.push((next, self.successors(&next).rev().copied().collect()));
                    } else if on_stack.contains(&next) {
                        let low = lowlink[&node].min(index[&next]);
                        lowlink.insert(node, low);
                    }
                    continue;
                }

                work.pop();
                if let Some((parent, _)) = work.last() {
                    let low = lowlink[parent].min(lowlink[&node]);
                    lowlink.insert(*parent, low);
                }
                if lowlink[&node] == index[&node] {
                    let mut component = BTreeSet::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(&member);
                        component.insert(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }

    /// Every simple directed cycle. Self-loops come first as one-node cycles.
    ///
    /// Stops with an error once more than `limit` cycles have been found.
    pub fn simple_cycles(&self, limit: usize) -> Result<Vec<Cycle>, ConflictGraphError> {
        let mut cycles: Vec<Cycle> = Vec::new();

        let mut graph = self.clone();
        for (node, out) in graph.adj.iter_mut() {
            if out.remove(node) {
                record(&mut cycles, vec![*node], limit)?;
            }
        }

        let mut pending: Vec<BTreeSet<Uuid>> = graph
            .strongly_connected_components()
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .collect();

        while let Some(mut scc) = pending.pop() {
            let sub = graph.subgraph(&scc);
            let Some(start) = scc.pop_first() else {
                continue;
            };

            let mut path = vec![start];
            let mut blocked: BTreeSet<Uuid> = BTreeSet::from([start]);
            let mut closed: BTreeSet<Uuid> = BTreeSet::new();
            let mut block_map: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
            let mut stack: Vec<(Uuid, Vec<Uuid>)> =
                vec![(start, sub.successors(&start).copied().collect())];

            while let Some((node, nbrs)) = stack.last_mut() {
                let node = *node;
                if let Some(next) = nbrs.pop() {
                    if next == start {
                        record(&mut cycles, path.clone(), limit)?;
                        closed.extend(path.iter().copied());
                    } else if !blocked.contains(&next) {
                        path.push(next);
                        stack.push((next, sub.successors(&next).copied().collect()));
                        closed.remove(&next);
                        blocked.insert(next);
                        continue;
                    }
                }
                if stack.last().is_some_and(|(_, nbrs)| nbrs.is_empty()) {
                    if closed.contains(&node) {
                        unblock(node, &mut blocked, &mut block_map);
                    } else {
                        for succ in sub.successors(&node) {
                            block_map.entry(*succ).or_default().insert(node);
                        }
                    }
                    stack.pop();
                    path.pop();
                }
            }

            // Continue on what is left of this component without `start`.
            let rest = graph.subgraph(&scc);
            pending.extend(
                rest.strongly_connected_components()
                    .into_iter()
                    .filter(|c| c.len() > 1),
            );
        }

        Ok(cycles)
    }
}

fn record(cycles: &mut Vec<Cycle>, cycle: Cycle, limit: usize) -> Result<(), ConflictGraphError> {
    if cycles.len() >= limit {
        return Err(ConflictGraphError::CycleLimitExceeded { limit });
    }
    cycles.push(cycle);
    Ok(())
}

fn unblock(
    node: Uuid,
    blocked: &mut BTreeSet<Uuid>,
    block_map: &mut HashMap<Uuid, BTreeSet<Uuid>>,
) {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if blocked.remove(&n)
            && let Some(waiting) = block_map.remove(&n)
        {
            stack.extend(waiting);
        }
    }
}

/// Ordering graph built from a collection snapshot.
#[derive(Debug)]
pub struct OrderedMarkers {
    graph: Digraph,
    representatives: HashMap<Uuid, Uuid>,
}

impl OrderedMarkers {
    pub fn build(collection: &Collection) -> Self {
        let mut markers: Vec<&Marker> = collection.markers().collect();
        markers.sort_by_key(|m| m.id());

        let mut groups = UnionFind::new();
        for marker in &markers {
            groups.insert(marker.id());
        }
        for marker in &markers {
            if let Some(rel) = marker.relations() {
                for same in &rel.sames {
                    groups.union(marker.id(), *same);
                }
            }
        }
        let representatives = groups.representatives();
        let rep = |id: &Uuid| representatives.get(id).copied().unwrap_or(*id);

        let mut graph = Digraph::new();
        for marker in &markers {
            graph.add_node(rep(&marker.id()));
        }

        let comparable: Vec<&Marker> = markers
            .iter()
            .copied()
            .filter(|m| m.time_point().is_some())
            .collect();
        for (i, a) in comparable.iter().enumerate() {
            for b in &comparable[i + 1..] {
                match a.compare(b) {
                    TimeRelativity::Before => graph.add_edge(rep(&a.id()), rep(&b.id())),
                    TimeRelativity::After => graph.add_edge(rep(&b.id()), rep(&a.id())),
                    TimeRelativity::Same | TimeRelativity::Unknown => {}
                }
            }
        }

        for marker in &markers {
            let Some(rel) = marker.relations() else {
                continue;
            };
            let this = rep(&marker.id());
            for after in &rel.afters {
                graph.add_edge(rep(after), this);
            }
            for before in &rel.befores {
                graph.add_edge(this, rep(before));
            }
            for same in &rel.sames {
                graph.add_node(rep(same));
            }
        }

        Self {
            graph,
            representatives,
        }
    }

    pub fn graph(&self) -> &Digraph {
        &self.graph
    }

    /// Group representative of `id`; identities never merged represent themselves.
    pub fn representative(&self, id: &Uuid) -> Uuid {
        self.representatives.get(id).copied().unwrap_or(*id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_edge(&self, from: &Uuid, to: &Uuid) -> bool {
        self.graph.has_edge(from, to)
    }

    pub fn cycles(&self) -> Result<Vec<Cycle>, ConflictGraphError> {
        self.graph.simple_cycles(MAX_CYCLES)
    }
}
