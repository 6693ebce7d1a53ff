use crate::registry::TaskRegistry;

/// Ready set sorted ascending by vruntime.
///
/// Entries are registry slot indices linked through the slots' own
/// `prev`/`next` fields, so insertion and removal never allocate. Insertion
/// walks from the head (O(n)); popping the head is O(1).
#[derive(Debug, Default)]
pub struct VruntimeQueue {
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl VruntimeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate slot indices from head to tail.
    pub fn iter<'a>(&self, registry: &'a TaskRegistry) -> impl Iterator<Item = u32> + 'a {
        std::iter::successors(self.head, move |&idx| registry.slot(idx).next)
    }

    /// Link `idx` immediately before the first entry whose vruntime is
    /// greater than or equal to its own. Ties therefore go to the newest
    /// arrival.
    pub(crate) fn insert(&mut self, registry: &mut TaskRegistry, idx: u32) {
        debug_assert!(!registry.slot(idx).queued, "slot {} already queued", idx);
        let vruntime = registry.slot(idx).vruntime;

        // Strictly past the tail: append without walking.
        let mut cursor = match self.tail {
            Some(tail) if registry.slot(tail).vruntime < vruntime => None,
            _ => self.head,
        };
        while let Some(at) = cursor {
            if vruntime <= registry.slot(at).vruntime {
                break;
            }
            cursor = registry.slot(at).next;
        }

        match cursor {
            Some(at) => self.link_before(registry, idx, at),
            None => self.link_back(registry, idx),
        }
        self.len += 1;
    }

    /// Remove `idx` from wherever it sits in the queue.
    pub(crate) fn unlink(&mut self, registry: &mut TaskRegistry, idx: u32) {
        let (prev, next) = {
            let slot = registry.slot(idx);
            debug_assert!(slot.queued, "slot {} not queued", idx);
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => registry.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => registry.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let slot = registry.slot_mut(idx);
        slot.prev = None;
        slot.next = None;
        slot.queued = false;
        self.len -= 1;
    }

    /// Unlink and return the head.
    pub(crate) fn pop_front(&mut self, registry: &mut TaskRegistry) -> Option<u32> {
        let head = self.head?;
        self.unlink(registry, head);
        Some(head)
    }

    fn link_before(&mut self, registry: &mut TaskRegistry, idx: u32, at: u32) {
        let prev = registry.slot(at).prev;
        {
            let slot = registry.slot_mut(idx);
            slot.prev = prev;
            slot.next = Some(at);
            slot.queued = true;
        }
        registry.slot_mut(at).prev = Some(idx);
        match prev {
            Some(p) => registry.slot_mut(p).next = Some(idx),
            None => self.head = Some(idx),
        }
    }

    fn link_back(&mut self, registry: &mut TaskRegistry, idx: u32) {
        let tail = self.tail;
        {
            let slot = registry.slot_mut(idx);
            slot.prev = tail;
            slot.next = None;
            slot.queued = true;
        }
        match tail {
            Some(t) => registry.slot_mut(t).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}
