//! Arena-backed bidirectional skip list.
//!
//! The classic construction: every node carries up to 33 link levels, a new
//! node's level is chosen by counting consecutive heads of simulated coin
//! flips, and expected insert/find/remove cost is O(log n).
//!
//! ```text
//! level 2   BEGIN ──────────────► c ───────────► END
//! level 1   BEGIN ──────► b ────► c ───────────► END
//! level 0   BEGIN ─► a ─► b ────► c ──► d ─────► END
//! ```
//!
//! Instead of raw node pointers with back-links, nodes live in a growable
//! arena and links are integer handles; the `BEGIN`/`END` sentinels are the
//! fixed handles 0 and 1. A removed node keeps its slot and payload so it
//! can be re-inserted elsewhere (rewrite rules relocate nodes); only
//! [`SkipList::discard`] frees the slot for reuse.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::span::Direction;

/// Handle to a node slot. Stable across removal and re-insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

pub const BEGIN: NodeId = NodeId(0);
pub const END: NodeId = NodeId(1);

/// One extra level per consecutive heads, capped at 32 extra levels.
const MAX_LEVELS: usize = 33;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: NodeId,
    next: NodeId,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    links: Vec<Link>,
    value: Option<T>,
    in_list: bool,
}

#[derive(Debug, Clone)]
pub struct SkipList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    levels: usize,
    len: usize,
    rng: StdRng,
}

impl<T> SkipList<T> {
    pub fn new() -> SkipList<T> {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic level generation, for reproducible tests.
    pub fn with_seed(seed: u64) -> SkipList<T> {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> SkipList<T> {
        let sentinel = || Slot {
            links: vec![Link { prev: BEGIN, next: END }; MAX_LEVELS],
            value: None,
            in_list: true,
        };
        SkipList { slots: vec![sentinel(), sentinel()], free: Vec::new(), levels: 1, len: 0, rng }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Link levels currently in use. Grows as taller nodes are inserted;
    /// shrinks only on [`SkipList::clear`].
    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn is_sentinel(&self, id: NodeId) -> bool {
        id == BEGIN || id == END
    }

    /// True if the node is currently linked into the list.
    pub fn contains(&self, id: NodeId) -> bool {
        !self.is_sentinel(id) && self.slots.get(id.0 as usize).is_some_and(|slot| slot.in_list)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.0 as usize).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id.0 as usize).and_then(|slot| slot.value.as_mut())
    }

    /// The sentinel that precedes everything in `dir`.
    pub fn begin(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::LeftToRight => BEGIN,
            Direction::RightToLeft => END,
        }
    }

    /// The sentinel that follows everything in `dir`.
    pub fn end(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::LeftToRight => END,
            Direction::RightToLeft => BEGIN,
        }
    }

    /// Level-0 successor in `dir`. Saturates at the sentinels.
    pub fn next(&self, id: NodeId, dir: Direction) -> NodeId {
        let link = self.slots[id.0 as usize].links[0];
        match dir {
            Direction::LeftToRight => link.next,
            Direction::RightToLeft => link.prev,
        }
    }

    /// Level-0 predecessor in `dir`.
    pub fn prev(&self, id: NodeId, dir: Direction) -> NodeId {
        self.next(id, dir.reverse())
    }

    pub fn first(&self, dir: Direction) -> Option<NodeId> {
        let id = self.next(self.begin(dir), dir);
        if self.is_sentinel(id) { None } else { Some(id) }
    }

    pub fn last(&self, dir: Direction) -> Option<NodeId> {
        self.first(dir.reverse())
    }

    /// Insert a value, positioned by `cmp` (a strict total order; ties are
    /// the caller's responsibility to break). Returns the new handle.
    pub fn insert(&mut self, value: T, cmp: impl Fn(&T, &T) -> Ordering) -> NodeId {
        let extra = self.random_level();
        let id = self.alloc(value, extra + 1);
        self.link(id, cmp);
        id
    }

    /// Re-link a node that was removed with [`SkipList::remove`]. The node
    /// gets a fresh random level. Returns false if the node is already
    /// linked or its slot was discarded.
    pub fn reinsert(&mut self, id: NodeId, cmp: impl Fn(&T, &T) -> Ordering) -> bool {
        if self.is_sentinel(id) {
            return false;
        }
        let extra = self.random_level();
        let Some(slot) = self.slots.get_mut(id.0 as usize) else {
            return false;
        };
        if slot.in_list || slot.value.is_none() {
            return false;
        }
        slot.links.clear();
        slot.links.resize(extra + 1, Link { prev: BEGIN, next: END });
        slot.in_list = true;
        self.link(id, cmp);
        true
    }

    /// Unlink a node at every level it participates in. The payload stays
    /// in the slot so the node can be re-inserted.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let links = self.slots[id.0 as usize].links.clone();
        for (level, link) in links.iter().enumerate() {
            self.slots[link.prev.0 as usize].links[level].next = link.next;
            self.slots[link.next.0 as usize].links[level].prev = link.prev;
        }
        self.slots[id.0 as usize].in_list = false;
        self.len -= 1;
        true
    }

    /// Remove the node and free its slot, returning the payload.
    pub fn discard(&mut self, id: NodeId) -> Option<T> {
        if self.is_sentinel(id) {
            return None;
        }
        if self.contains(id) {
            self.remove(id);
        }
        let slot = self.slots.get_mut(id.0 as usize)?;
        let value = slot.value.take()?;
        slot.links.clear();
        self.free.push(id.0);
        Some(value)
    }

    pub fn clear(&mut self) {
        let rng = self.rng.clone();
        *self = Self::with_rng(rng);
    }

    /// Skip-list descent: `Ok` on an exact comparator match, `Err` with the
    /// closest node that still precedes the probe in `dir` terms (possibly
    /// a sentinel). `start` narrows repeated localized lookups.
    pub fn find(
        &self,
        probe: &T,
        dir: Direction,
        start: Option<NodeId>,
        cmp: impl Fn(&T, &T) -> Ordering,
    ) -> Result<NodeId, NodeId> {
        let start = start.unwrap_or(self.begin(dir));
        let top = if self.is_sentinel(start) { self.levels } else { self.slots[start.0 as usize].links.len() };
        // Step back one at the node's top level so the descent can see the
        // start node itself.
        let mut cur = if self.is_sentinel(start) { start } else { self.next_at(start, top - 1, dir.reverse()) };
        for level in (0..top).rev() {
            loop {
                let next = self.next_at(cur, level, dir);
                if next == self.end(dir) {
                    break;
                }
                let mut ord = cmp(self.value_ref(next), probe);
                if dir == Direction::RightToLeft {
                    ord = ord.reverse();
                }
                match ord {
                    Ordering::Greater => break,
                    Ordering::Equal => return Ok(next),
                    Ordering::Less => cur = next,
                }
            }
        }
        Err(cur)
    }

    /// In-order walk of the live nodes.
    pub fn iter(&self, dir: Direction) -> Iter<'_, T> {
        Iter { list: self, cur: self.next(self.begin(dir), dir), dir }
    }

    fn value_ref(&self, id: NodeId) -> &T {
        self.slots[id.0 as usize].value.as_ref().expect("sentinels are never compared")
    }

    fn next_at(&self, id: NodeId, level: usize, dir: Direction) -> NodeId {
        let link = self.slots[id.0 as usize].links[level];
        match dir {
            Direction::LeftToRight => link.next,
            Direction::RightToLeft => link.prev,
        }
    }

    /// Count consecutive 1-bits of a random word; the count is the number
    /// of extra levels, growing the list's level count by at most one.
    fn random_level(&mut self) -> usize {
        let mut extra = 0usize;
        let mut r: u32 = self.rng.r#gen();
        while r & 1 == 1 {
            extra += 1;
            if extra == self.levels {
                self.levels += 1;
                break;
            }
            r >>= 1;
        }
        extra
    }

    fn alloc(&mut self, value: T, levels: usize) -> NodeId {
        let links = vec![Link { prev: BEGIN, next: END }; levels];
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Slot { links, value: Some(value), in_list: true };
                NodeId(index)
            }
            None => {
                self.slots.push(Slot { links, value: Some(value), in_list: true });
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    fn link(&mut self, id: NodeId, cmp: impl Fn(&T, &T) -> Ordering) {
        let node_levels = self.slots[id.0 as usize].links.len();
        let mut cur = BEGIN;
        for level in (0..self.levels).rev() {
            loop {
                let next = self.slots[cur.0 as usize].links[level].next;
                if next == END || next == id {
                    break;
                }
                if cmp(self.value_ref(next), self.value_ref(id)) == Ordering::Greater {
                    break;
                }
                cur = next;
            }
            if level < node_levels {
                let next = self.slots[cur.0 as usize].links[level].next;
                self.slots[id.0 as usize].links[level] = Link { prev: cur, next };
                self.slots[cur.0 as usize].links[level].next = id;
                self.slots[next.0 as usize].links[level].prev = id;
            }
        }
        self.len += 1;
    }
}

impl<T> Default for SkipList<T> {
    fn default() -> SkipList<T> {
        SkipList::new()
    }
}

pub struct Iter<'a, T> {
    list: &'a SkipList<T>,
    cur: NodeId,
    dir: Direction,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.list.is_sentinel(self.cur) {
            return None;
        }
        let id = self.cur;
        self.cur = self.list.next(id, self.dir);
        Some((id, self.list.value_ref(id)))
    }
}
