//! Doubly-linked playlist with a stable insertion order and an independent
//! live play order (identical unless shuffle is on).

use std::sync::Mutex;

use rand::seq::SliceRandom;

use crate::track::Track;

/// Handle to a playlist entry. Carries a generation counter so a handle
/// held by the controller after the node has been dequeued and its slot
/// reused is detected as stale rather than silently resolving to the wrong
/// track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    index: u32,
    generation: u32,
}

/// Repeat behavior, promoted to a tri-state enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Track,
    List,
}

impl RepeatMode {
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::List,
            RepeatMode::List => RepeatMode::Off,
        }
    }
}

struct Slot {
    track: Track,
    generation: u32,
    occupied: bool,
    ordered_prev: Option<u32>,
    ordered_next: Option<u32>,
    current_prev: Option<u32>,
    current_next: Option<u32>,
}

struct Inner {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    ordered_head: Option<u32>,
    ordered_tail: Option<u32>,
    current_head: Option<u32>,
    current_tail: Option<u32>,
    shuffle_on: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            ordered_head: None,
            ordered_tail: None,
            current_head: None,
            current_tail: None,
            shuffle_on: false,
        }
    }

    fn resolve(&self, node: NodeRef) -> Option<&Slot> {
        self.slots
            .get(node.index as usize)
            .filter(|s| s.occupied && s.generation == node.generation)
    }

    fn resolve_mut(&mut self, node: NodeRef) -> Option<&mut Slot> {
        self.slots
            .get_mut(node.index as usize)
            .filter(|s| s.occupied && s.generation == node.generation)
    }

    fn enqueue(&mut self, track: Track) -> NodeRef {
        let (index, generation) = if let Some(index) = self.free_list.pop() {
            let gen = self.slots[index as usize].generation + 1;
            (index, gen)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                track: track.clone(),
                generation: 0,
                occupied: false,
                ordered_prev: None,
                ordered_next: None,
                current_prev: None,
                current_next: None,
            });
            (index, 0)
        };

        self.slots[index as usize] = Slot {
            track,
            generation,
            occupied: true,
            ordered_prev: self.ordered_tail,
            ordered_next: None,
            current_prev: self.current_tail,
            current_next: None,
        };

        if let Some(tail) = self.ordered_tail {
            self.slots[tail as usize].ordered_next = Some(index);
        } else {
            self.ordered_head = Some(index);
        }
        self.ordered_tail = Some(index);

        if let Some(tail) = self.current_tail {
            self.slots[tail as usize].current_next = Some(index);
        } else {
            self.current_head = Some(index);
        }
        self.current_tail = Some(index);

        NodeRef { index, generation }
    }

    fn unlink_ordered(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.ordered_prev, slot.ordered_next)
        };
        match prev {
            Some(p) => self.slots[p as usize].ordered_next = next,
            None => self.ordered_head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].ordered_prev = prev,
            None => self.ordered_tail = prev,
        }
    }

    fn unlink_current(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.current_prev, slot.current_next)
        };
        match prev {
            Some(p) => self.slots[p as usize].current_next = next,
            None => self.current_head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].current_prev = prev,
            None => self.current_tail = prev,
        }
    }

    fn dequeue(&mut self, node: NodeRef) -> bool {
        if self.resolve(node).is_none() {
            return false;
        }
        let index = node.index;
        self.unlink_ordered(index);
        self.unlink_current(index);
        self.slots[index as usize].occupied = false;
        self.free_list.push(index);
        true
    }

    fn ordered_ids(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = self.ordered_head;
        while let Some(i) = cur {
            out.push(i);
            cur = self.slots[i as usize].ordered_next;
        }
        out
    }

    fn current_ids(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = self.current_head;
        while let Some(i) = cur {
            out.push(i);
            cur = self.slots[i as usize].current_next;
        }
        out
    }

    fn relink_current_in_order(&mut self, order: &[u32]) {
        self.current_head = order.first().copied();
        self.current_tail = order.last().copied();
        for (pos, &index) in order.iter().enumerate() {
            let prev = if pos == 0 { None } else { Some(order[pos - 1]) };
            let next = order.get(pos + 1).copied();
            self.slots[index as usize].current_prev = prev;
            self.slots[index as usize].current_next = next;
        }
    }
}

/// Thread-safe doubly-linked playlist. Every public operation takes the
/// mutex for the duration of an O(1) link edit or, for shuffle, an O(n)
/// pass — the loader thread never holds this mutex at the same time as
/// the pipeline mutex.
pub struct Playlist {
    inner: Mutex<Inner>,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Playlist {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::new()) }
    }

    pub fn enqueue(&self, track: Track) -> NodeRef {
        self.inner.lock().expect("playlist mutex poisoned").enqueue(track)
    }

    pub fn dequeue(&self, node: NodeRef) -> bool {
        self.inner.lock().expect("playlist mutex poisoned").dequeue(node)
    }

    #[must_use]
    pub fn track(&self, node: NodeRef) -> Option<Track> {
        self.inner
            .lock()
            .expect("playlist mutex poisoned")
            .resolve(node)
            .map(|s| s.track.clone())
    }

    #[must_use]
    pub fn find_by_id(&self, id: u32) -> Option<NodeRef> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        inner.ordered_ids().into_iter().find_map(|i| {
            let slot = &inner.slots[i as usize];
            (slot.track.id == id).then_some(NodeRef { index: i, generation: slot.generation })
        })
    }

    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<NodeRef> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        inner.ordered_ids().into_iter().find_map(|i| {
            let slot = &inner.slots[i as usize];
            (slot.track.file_path == path).then_some(NodeRef { index: i, generation: slot.generation })
        })
    }

    #[must_use]
    pub fn ordered_len(&self) -> usize {
        self.inner.lock().expect("playlist mutex poisoned").ordered_ids().len()
    }

    #[must_use]
    pub fn ordered_tracks(&self) -> Vec<Track> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        inner.ordered_ids().iter().map(|&i| inner.slots[i as usize].track.clone()).collect()
    }

    #[must_use]
    pub fn current_head(&self) -> Option<NodeRef> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        inner.current_head.map(|i| NodeRef { index: i, generation: inner.slots[i as usize].generation })
    }

    /// Move `node` one position earlier in the stable insertion order. If
    /// shuffle is off, the live play order is kept in sync.
    pub fn move_up(&self, node: NodeRef) -> bool {
        let mut inner = self.inner.lock().expect("playlist mutex poisoned");
        let Some(prev) = inner.resolve(node).and_then(|s| s.ordered_prev) else {
            return false;
        };
        inner.unlink_ordered(node.index);
        let before = inner.slots[prev as usize].ordered_prev;
        inner.slots[node.index as usize].ordered_prev = before;
        inner.slots[node.index as usize].ordered_next = Some(prev);
        match before {
            Some(b) => inner.slots[b as usize].ordered_next = Some(node.index),
            None => inner.ordered_head = Some(node.index),
        }
        inner.slots[prev as usize].ordered_prev = Some(node.index);
        if !inner.shuffle_on {
            let order = inner.ordered_ids();
            inner.relink_current_in_order(&order);
        }
        true
    }

    /// Move `node` one position later in the stable insertion order.
    pub fn move_down(&self, node: NodeRef) -> bool {
        let mut inner = self.inner.lock().expect("playlist mutex poisoned");
        let Some(next) = inner.resolve(node).and_then(|s| s.ordered_next) else {
            return false;
        };
        // Moving `node` down by one is moving `next` up by one.
        let swapped = NodeRef { index: next, generation: inner.slots[next as usize].generation };
        drop(inner);
        self.move_up(swapped)
    }

    /// Fisher-Yates shuffle of every node except `anchor`, which is
    /// prepended so it stays first in the new live play order.
    pub fn shuffle_from(&self, anchor: NodeRef) {
        let mut inner = self.inner.lock().expect("playlist mutex poisoned");
        if inner.resolve(anchor).is_none() {
            return;
        }
        let mut rest: Vec<u32> = inner.ordered_ids().into_iter().filter(|&i| i != anchor.index).collect();
        rest.shuffle(&mut rand::rng());
        let mut order = vec![anchor.index];
        order.extend(rest);
        inner.relink_current_in_order(&order);
        inner.shuffle_on = true;
    }

    /// Restore the live play order to exactly match the stable insertion
    /// order.
    pub fn restore_ordered(&self) {
        let mut inner = self.inner.lock().expect("playlist mutex poisoned");
        let order = inner.ordered_ids();
        inner.relink_current_in_order(&order);
        inner.shuffle_on = false;
    }

    #[must_use]
    pub fn is_shuffled(&self) -> bool {
        self.inner.lock().expect("playlist mutex poisoned").shuffle_on
    }

    /// Next node in live play order given `repeat_mode`.
    #[must_use]
    pub fn next_from(&self, node: NodeRef, repeat_mode: RepeatMode) -> Option<NodeRef> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        let slot = inner.resolve(node)?;
        match repeat_mode {
            RepeatMode::Track => Some(node),
            RepeatMode::Off => slot
                .current_next
                .map(|i| NodeRef { index: i, generation: inner.slots[i as usize].generation }),
            RepeatMode::List => {
                let next = slot.current_next.or(inner.current_head);
                next.map(|i| NodeRef { index: i, generation: inner.slots[i as usize].generation })
            }
        }
    }

    #[must_use]
    pub fn prev_from(&self, node: NodeRef) -> Option<NodeRef> {
        let inner = self.inner.lock().expect("playlist mutex poisoned");
        let slot = inner.resolve(node)?;
        slot.current_prev
            .map(|i| NodeRef { index: i, generation: inner.slots[i as usize].generation })
    }
}
