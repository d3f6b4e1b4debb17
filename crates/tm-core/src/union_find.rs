//! Disjoint sets over marker identities.
//!
//! Index-backed with path compression and union by rank. `find` walks the
//! parent chain in a loop, so long "same" chains cannot overflow the stack.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct UnionFind {
    index: HashMap<Uuid, usize>,
    ids: Vec<Uuid>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `id`, creating a singleton set on first sight.
    pub fn insert(&mut self, id: Uuid) -> usize {
        if let Some(&slot) = self.index.get(&id) {
            return slot;
        }
        let slot = self.ids.len();
        self.index.insert(id, slot);
        self.ids.push(id);
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn find_slot(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = slot;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Root identity of the set containing `id`, or `None` if never inserted.
    pub fn find(&mut self, id: &Uuid) -> Option<Uuid> {
        let slot = *self.index.get(id)?;
        let root = self.find_slot(slot);
        Some(self.ids[root])
    }

    /// Merge the sets of `a` and `b`, inserting either if needed.
    pub fn union(&mut self, a: Uuid, b: Uuid) {
        let sa = self.insert(a);
        let sb = self.insert(b);
        let ra = self.find_slot(sa);
        let rb = self.find_slot(sb);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Map every identity to a canonical representative: the smallest
    /// identity in its set. Independent of insertion and union order.
    pub fn representatives(&mut self) -> HashMap<Uuid, Uuid> {
        let mut smallest: HashMap<usize, Uuid> = HashMap::new();
        let mut roots = Vec::with_capacity(self.ids.len());
        for slot in 0..self.ids.len() {
            let root = self.find_slot(slot);
            roots.push(root);
            let id = self.ids[slot];
            smallest
                .entry(root)
                .and_modify(|min| {
                    if id < *min {
                        *min = id;
                    }
                })
                .or_insert(id);
        }
        self.ids
            .iter()
            .zip(roots)
            .map(|(id, root)| (*id, smallest[&root]))
            .collect()
    }
}
