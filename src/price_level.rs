//! Price Level - A FIFO queue of orders at a single price point.
//!
//! Implements a doubly-linked list using arena indices for O(1)
//! insertion, removal from head, and removal from arbitrary position.

use rust_decimal::Decimal;

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};

/// A queue of orders resting at one exact price.
///
/// Orders are processed in FIFO order (price-time priority). A partially
/// filled head keeps its place. The book drops a level as soon as it
/// becomes empty.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    /// The exact price every order in this level carries
    pub price: Decimal,
    /// Index of the oldest order (highest priority, first to match)
    pub head: ArenaIndex,
    /// Index of the newest order (last to match)
    pub tail: ArenaIndex,
    /// Total remaining quantity across all orders at this level
    pub total_qty: u64,
    /// Number of orders at this level
    pub count: u32,
}

impl PriceLevel {
    /// Create a new empty price level
    #[inline]
    pub const fn new(price: Decimal) -> Self {
        Self {
            price,
            head: NULL_INDEX,
            tail: NULL_INDEX,
            total_qty: 0,
            count: 0,
        }
    }

    /// Returns true if there are no orders at this level
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append an order to the tail of the queue (newest order).
    ///
    /// The caller guarantees the aggregate cannot overflow
    /// (see `OrderBook::level_has_room`).
    #[inline]
    pub fn push_back(&mut self, arena: &mut Arena, index: ArenaIndex) {
        debug_assert_eq!(arena.get(index).price, self.price);

        let old_tail = self.tail;
        let node = arena.get_mut(index);
        node.prev = old_tail;
        node.next = NULL_INDEX;
        let qty = node.remaining;

        match old_tail {
            NULL_INDEX => self.head = index,
            tail => arena.get_mut(tail).next = index,
        }
        self.tail = index;

        self.count += 1;
        self.total_qty += qty;
    }

    /// Detach the oldest order. The arena slot stays allocated.
    #[inline]
    pub fn pop_front(&mut self, arena: &mut Arena) -> Option<ArenaIndex> {
        let head = self.head;
        if head == NULL_INDEX {
            return None;
        }
        self.unlink(arena, head);
        Some(head)
    }

    /// Detach an order from anywhere in the queue (cancel). The arena
    /// slot stays allocated.
    ///
    /// Returns `true` if the level is now empty.
    #[inline]
    pub fn remove(&mut self, arena: &mut Arena, index: ArenaIndex) -> bool {
        self.unlink(arena, index);
        self.is_empty()
    }

    fn unlink(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let node = arena.get(index);
        let (prev, next, qty) = (node.prev, node.next, node.remaining);

        match prev {
            NULL_INDEX => {
                debug_assert_eq!(self.head, index);
                self.head = next;
            }
            prev => arena.get_mut(prev).next = next,
        }
        match next {
            NULL_INDEX => {
                debug_assert_eq!(self.tail, index);
                self.tail = prev;
            }
            next => arena.get_mut(next).prev = prev,
        }

        let node = arena.get_mut(index);
        node.prev = NULL_INDEX;
        node.next = NULL_INDEX;

        self.count -= 1;
        self.total_qty -= qty;
    }

    /// Peek at the head order without removing it.
    ///
    /// # Returns
    /// Index of the head order, or `NULL_INDEX` if empty.
    #[inline]
    pub const fn peek_head(&self) -> ArenaIndex {
        self.head
    }

    /// Update total quantity after a partial fill.
    ///
    /// Call this after modifying an order's remaining quantity directly.
    #[inline]
    pub fn subtract_qty(&mut self, qty: u64) {
        debug_assert!(self.total_qty >= qty);
        self.total_qty -= qty;
    }

    /// Walk the queue front to back.
    pub fn indices<'a>(&self, arena: &'a Arena) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
        }
    }
}

/// Iterator over the arena indices of a level, in time priority.
pub struct LevelIter<'a> {
    arena: &'a Arena,
    cursor: ArenaIndex,
}

impl Iterator for LevelIter<'_> {
    type Item = ArenaIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NULL_INDEX {
            return None;
        }
        let index = self.cursor;
        self.cursor = self.arena.get(index).next;
        Some(index)
    }
}
